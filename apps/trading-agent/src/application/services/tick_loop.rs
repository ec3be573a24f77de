//! Tick Loop
//!
//! Periodic driver: resynchronize state from the trade service, then run the decision
//! engine. Each broker call carries its own deadline; a failed or slow facet keeps its
//! previous snapshot and is retried on the next tick.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::decision_engine::{DecisionEngine, DecisionReport};
use crate::application::ports::{EventPublisherPort, SignalSource, TradeError, TradeService};
use crate::application::state::StateStore;
use crate::domain::shared::Symbol;

/// Tick loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickLoopConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Deadline for each resync call.
    pub sync_timeout: Duration,
}

impl Default for TickLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            sync_timeout: Duration::from_secs(10),
        }
    }
}

/// Which facets were refreshed by a resync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Balance refreshed.
    pub balance: bool,
    /// Positions refreshed.
    pub positions: bool,
    /// Orders refreshed.
    pub orders: bool,
    /// Number of prices refreshed.
    pub prices: usize,
}

impl ResyncReport {
    /// True if balance, positions and orders all refreshed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.balance && self.positions && self.orders
    }
}

/// Periodic resync and decision driver.
pub struct TickLoop<T, G, E>
where
    T: TradeService,
    G: SignalSource,
    E: EventPublisherPort,
{
    trade: Arc<T>,
    state: Arc<StateStore>,
    engine: DecisionEngine<T, G, E>,
    config: TickLoopConfig,
}

impl<T, G, E> TickLoop<T, G, E>
where
    T: TradeService + 'static,
    G: SignalSource + 'static,
    E: EventPublisherPort + 'static,
{
    /// Create a tick loop around `engine`.
    pub const fn new(
        trade: Arc<T>,
        state: Arc<StateStore>,
        engine: DecisionEngine<T, G, E>,
        config: TickLoopConfig,
    ) -> Self {
        Self {
            trade,
            state,
            engine,
            config,
        }
    }

    /// Shared state.
    pub const fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// One tick: resync, then exits and entries.
    pub async fn tick(&self) -> DecisionReport {
        let resync = self.resync().await;
        if !resync.is_complete() {
            tracing::warn!(?resync, "Resync incomplete, deciding on stale facets");
        }
        let report = self.engine.evaluate().await;
        tracing::info!(
            exits = report.exits.len(),
            entries = report.entries.len(),
            "Tick complete"
        );
        report
    }

    /// Refresh balance, positions, orders and prices.
    ///
    /// Facets are fetched concurrently and independently. A failure or timeout is
    /// logged and leaves that facet's previous snapshot in place.
    pub async fn resync(&self) -> ResyncReport {
        let (balance, positions, orders) = tokio::join!(
            self.bounded("balance", self.trade.get_balance()),
            self.bounded("positions", self.trade.get_positions()),
            self.bounded("orders", self.trade.get_orders()),
        );

        let mut report = ResyncReport::default();
        if let Some(balance) = balance {
            tracing::debug!(buying_power = %balance.buying_power, "Balance synchronized");
            self.state.update_balance(balance);
            report.balance = true;
        }
        if let Some(positions) = positions {
            tracing::debug!(count = positions.len(), "Positions synchronized");
            self.state.update_positions(positions);
            report.positions = true;
        }
        if let Some(orders) = orders {
            tracing::debug!(count = orders.len(), "Orders synchronized");
            self.state.update_orders(orders);
            report.orders = true;
        }
        report.prices = self.resync_prices().await;
        report
    }

    async fn resync_prices(&self) -> usize {
        let mut symbols: BTreeSet<Symbol> =
            self.engine.params().target_symbols.iter().cloned().collect();
        symbols.extend(
            self.state
                .get_positions()
                .iter()
                .map(|p| p.read().symbol().clone()),
        );

        let fetched = join_all(symbols.into_iter().map(|symbol| async move {
            let price = self.bounded("price", self.trade.get_price(&symbol)).await;
            (symbol, price.flatten())
        }))
        .await;

        let mut refreshed = 0;
        for (symbol, price) in fetched {
            if let Some(price) = price {
                self.state.update_price(symbol, price);
                refreshed += 1;
            }
        }
        refreshed
    }

    async fn bounded<R>(
        &self,
        facet: &'static str,
        call: impl Future<Output = Result<R, TradeError>>,
    ) -> Option<R> {
        match tokio::time::timeout(self.config.sync_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::error!(facet, error = %e, "Resync failed, keeping previous snapshot");
                None
            }
            Err(_) => {
                tracing::error!(
                    facet,
                    timeout_secs = self.config.sync_timeout.as_secs(),
                    "Resync timed out, keeping previous snapshot"
                );
                None
            }
        }
    }

    /// Tick on the configured interval until `shutdown` fires.
    ///
    /// A tick in progress runs to completion; no tick starts after cancellation.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.config.interval.as_secs(), "Tick loop started");
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::info!("Tick loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Run the loop on a background task.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NoOpEventPublisher, PlaceOrderRequest, SignalError};
    use crate::application::services::StrategyParams;
    use crate::domain::account::Balance;
    use crate::domain::market::{PriceBar, TradeSignal};
    use crate::domain::order_execution::Order;
    use crate::domain::position::{Position, PositionKey};
    use crate::domain::shared::OrderId;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Balance answers, positions hang, orders fail.
    #[derive(Default)]
    struct FlakyTradeService {
        balance_calls: AtomicUsize,
    }

    #[async_trait]
    impl TradeService for FlakyTradeService {
        async fn get_balance(&self) -> Result<Balance, TradeError> {
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Balance::all_cash(dec!(5000000)))
        }

        async fn get_positions(&self) -> Result<Vec<Position>, TradeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn get_orders(&self) -> Result<Vec<Order>, TradeError> {
            Err(TradeError::Connection {
                message: "connection reset".to_string(),
            })
        }

        async fn place_order(&self, _request: PlaceOrderRequest) -> Result<Order, TradeError> {
            Err(TradeError::Unsupported {
                operation: "place_order".to_string(),
            })
        }

        async fn cancel_order(&self, _order_id: &OrderId) -> Result<(), TradeError> {
            Ok(())
        }

        async fn update_position_tracking(
            &self,
            _key: &PositionKey,
            _highest_price: Decimal,
            _trailing_stop_price: Decimal,
        ) -> Result<(), TradeError> {
            Ok(())
        }

        async fn get_price_history(
            &self,
            _symbol: &Symbol,
            _days: usize,
        ) -> Result<Vec<PriceBar>, TradeError> {
            Ok(Vec::new())
        }

        async fn get_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, TradeError> {
            Ok((symbol.as_str() == "7203").then_some(dec!(1000)))
        }
    }

    struct NoSignals;

    #[async_trait]
    impl SignalSource for NoSignals {
        async fn latest_signals(&self) -> Result<Vec<TradeSignal>, SignalError> {
            Ok(Vec::new())
        }
    }

    fn tick_loop(
        trade: Arc<FlakyTradeService>,
        state: Arc<StateStore>,
        interval: Duration,
    ) -> TickLoop<FlakyTradeService, NoSignals, NoOpEventPublisher> {
        let params = StrategyParams {
            target_symbols: vec![Symbol::new("7203"), Symbol::new("6758")],
            ..StrategyParams::default()
        };
        let engine = DecisionEngine::new(
            Arc::clone(&trade),
            Arc::new(NoSignals),
            Arc::new(NoOpEventPublisher),
            Arc::clone(&state),
            params,
        );
        TickLoop::new(
            trade,
            state,
            engine,
            TickLoopConfig {
                interval,
                sync_timeout: Duration::from_millis(50),
            },
        )
    }

    #[tokio::test]
    async fn failing_facets_keep_previous_snapshot() {
        let state = Arc::new(StateStore::new());
        let held = Position::open_long(PositionKey::cash(Symbol::new("7203")), dec!(900), 100);
        state.update_positions(vec![held]);

        let tick_loop = tick_loop(
            Arc::new(FlakyTradeService::default()),
            Arc::clone(&state),
            Duration::from_secs(60),
        );
        let report = tick_loop.resync().await;

        assert!(report.balance);
        assert!(!report.positions);
        assert!(!report.orders);
        assert!(!report.is_complete());
        assert_eq!(report.prices, 1);
        assert_eq!(state.get_balance().buying_power, dec!(5000000));
        assert_eq!(state.get_positions().len(), 1);
        assert_eq!(state.get_price(&Symbol::new("7203")), Some(dec!(1000)));
        assert_eq!(state.get_price(&Symbol::new("6758")), None);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let trade = Arc::new(FlakyTradeService::default());
        let state = Arc::new(StateStore::new());
        let tick_loop = Arc::new(tick_loop(
            Arc::clone(&trade),
            state,
            Duration::from_millis(20),
        ));

        let shutdown = CancellationToken::new();
        let handle = Arc::clone(&tick_loop).spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let ticks = trade.balance_calls.load(Ordering::SeqCst);
        assert!(ticks >= 2, "expected at least two ticks, got {ticks}");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(trade.balance_calls.load(Ordering::SeqCst), ticks);
    }
}
