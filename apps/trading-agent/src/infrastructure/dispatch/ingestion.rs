//! Ingestion loop: one sequential consumer per stream connection.
//!
//! Every message is parsed, classified by `p_cmd`, and dispatched. A failure on one
//! message is logged and the loop moves on to the next.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::dispatcher::{Dispatcher, EventKind};
use crate::infrastructure::protocol::{self, Command};

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Handled by the handler for this kind.
    Dispatched(EventKind),
    /// Keep-alive, dropped.
    KeepAlive,
    /// Blank message, nothing to do.
    Empty,
    /// No `p_cmd`, an unknown command, or no handler for the kind; dropped.
    Ignored,
    /// Malformed message, dropped.
    ParseFailed,
    /// The handler returned an error.
    HandlerFailed(EventKind),
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Messages received.
    pub received: u64,
    /// Messages handled successfully.
    pub dispatched: u64,
    /// Keep-alives, blanks, unknown commands, kinds without a handler.
    pub ignored: u64,
    /// Malformed messages.
    pub parse_errors: u64,
    /// Messages whose handler failed.
    pub handler_errors: u64,
}

impl IngestionStats {
    fn record(&mut self, outcome: MessageOutcome) {
        self.received += 1;
        match outcome {
            MessageOutcome::Dispatched(_) => self.dispatched += 1,
            MessageOutcome::KeepAlive | MessageOutcome::Empty | MessageOutcome::Ignored => {
                self.ignored += 1;
            }
            MessageOutcome::ParseFailed => self.parse_errors += 1,
            MessageOutcome::HandlerFailed(_) => self.handler_errors += 1,
        }
    }
}

/// Parses raw stream messages and feeds them to a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct Ingestion {
    dispatcher: Arc<Dispatcher>,
}

impl Ingestion {
    /// Create an ingestion stage over `dispatcher`.
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Process one raw message. Never fails: every error is logged and reported as an
    /// outcome.
    pub async fn process(&self, raw: &[u8]) -> MessageOutcome {
        let fields = match protocol::parse(raw) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed stream message");
                return MessageOutcome::ParseFailed;
            }
        };

        if fields.is_empty() {
            return MessageOutcome::Empty;
        }

        let Some(command) = Command::of(&fields) else {
            tracing::warn!(fields = ?fields, "p_cmd not found in stream message");
            return MessageOutcome::Ignored;
        };

        let Some(kind) = command.event_kind() else {
            if command == Command::KeepAlive {
                tracing::debug!("Keep-alive received");
                return MessageOutcome::KeepAlive;
            }
            tracing::warn!(command = %command, fields = ?fields, "Unhandled stream command");
            return MessageOutcome::Ignored;
        };

        match self.dispatcher.dispatch(kind, &fields).await {
            Ok(true) => MessageOutcome::Dispatched(kind),
            Ok(false) => MessageOutcome::Ignored,
            Err(e) if e.is_integrity() => {
                tracing::error!(event_type = %kind, error = %e, "Integrity error while handling event");
                MessageOutcome::HandlerFailed(kind)
            }
            Err(e) => {
                tracing::warn!(event_type = %kind, error = %e, "Failed to handle event");
                MessageOutcome::HandlerFailed(kind)
            }
        }
    }

    /// Consume `messages` in order until the channel closes or `shutdown` fires.
    ///
    /// A message already being processed when `shutdown` fires is finished first.
    pub async fn run(
        &self,
        mut messages: mpsc::Receiver<Vec<u8>>,
        shutdown: CancellationToken,
    ) -> IngestionStats {
        let mut stats = IngestionStats::default();

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::info!("Ingestion shutdown requested");
                    break;
                }
                msg = messages.recv() => {
                    let Some(raw) = msg else {
                        tracing::info!("Ingestion stream closed");
                        break;
                    };
                    stats.record(self.process(&raw).await);
                }
            }
        }

        tracing::info!(
            received = stats.received,
            dispatched = stats.dispatched,
            parse_errors = stats.parse_errors,
            handler_errors = stats.handler_errors,
            "Ingestion stopped"
        );
        stats
    }

    /// Run on a background task.
    pub fn spawn(
        self,
        messages: mpsc::Receiver<Vec<u8>>,
        shutdown: CancellationToken,
    ) -> JoinHandle<IngestionStats> {
        tokio::spawn(async move { self.run(messages, shutdown).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::StateStore;
    use crate::domain::shared::Symbol;
    use crate::infrastructure::dispatch::{PriceHandler, StatusHandler};
    use crate::infrastructure::protocol::encode_pairs;
    use rust_decimal_macros::dec;

    fn ingestion_with_prices() -> (Arc<StateStore>, Ingestion) {
        let state = Arc::new(StateStore::new());
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register(
            EventKind::Feed,
            Arc::new(PriceHandler::new(Arc::clone(&state), &[Symbol::new("7203")])),
        );
        dispatcher.register(EventKind::Status, Arc::new(StatusHandler));
        (state, Ingestion::new(dispatcher))
    }

    #[tokio::test]
    async fn process_classifies_messages() {
        let (state, ingestion) = ingestion_with_prices();

        assert_eq!(
            ingestion
                .process(&encode_pairs(&[("p_cmd", "FD"), ("p_1_DPP", "2500")]))
                .await,
            MessageOutcome::Dispatched(EventKind::Feed)
        );
        assert_eq!(state.get_price(&Symbol::new("7203")), Some(dec!(2500)));

        assert_eq!(
            ingestion.process(&encode_pairs(&[("p_cmd", "KP")])).await,
            MessageOutcome::KeepAlive
        );
        assert_eq!(
            ingestion.process(&encode_pairs(&[("p_cmd", "ZZ")])).await,
            MessageOutcome::Ignored
        );
        assert_eq!(
            ingestion.process(&encode_pairs(&[("p_no", "1")])).await,
            MessageOutcome::Ignored
        );
        assert_eq!(ingestion.process(b"\r\n").await, MessageOutcome::Empty);
        assert_eq!(ingestion.process(b"\x01\x01").await, MessageOutcome::ParseFailed);
    }

    #[tokio::test]
    async fn process_unregistered_kind_is_ignored() {
        let (_state, ingestion) = ingestion_with_prices();
        let outcome = ingestion
            .process(&encode_pairs(&[("p_cmd", "EC"), ("p_ON", "1")]))
            .await;
        assert_eq!(outcome, MessageOutcome::Ignored);
    }

    #[tokio::test]
    async fn run_counts_unhandled_kind_as_ignored() {
        let (_state, ingestion) = ingestion_with_prices();
        let (tx, rx) = mpsc::channel(8);

        tx.send(encode_pairs(&[("p_cmd", "EC"), ("p_ON", "1")])).await.unwrap();
        tx.send(encode_pairs(&[("p_cmd", "FD"), ("p_1_DPP", "2600")])).await.unwrap();
        drop(tx);

        let stats = ingestion.run(rx, CancellationToken::new()).await;

        assert_eq!(stats.received, 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.ignored, 1);
    }

    #[tokio::test]
    async fn run_continues_past_bad_messages() {
        let (state, ingestion) = ingestion_with_prices();
        let (tx, rx) = mpsc::channel(8);

        tx.send(b"\x01".to_vec()).await.unwrap();
        tx.send(encode_pairs(&[("p_cmd", "ST"), ("p_status", "0")])).await.unwrap();
        tx.send(encode_pairs(&[("p_cmd", "FD"), ("p_1_DPP", "2600")])).await.unwrap();
        drop(tx);

        let stats = ingestion.run(rx, CancellationToken::new()).await;

        assert_eq!(stats.received, 3);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(state.get_price(&Symbol::new("7203")), Some(dec!(2600)));
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (_state, ingestion) = ingestion_with_prices();
        let (tx, rx) = mpsc::channel::<Vec<u8>>(8);
        let shutdown = CancellationToken::new();

        let handle = ingestion.spawn(rx, shutdown.clone());
        shutdown.cancel();

        let stats = handle.await.unwrap();
        assert_eq!(stats.received, 0);
        drop(tx);
    }
}
