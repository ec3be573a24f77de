//! Execution Pipeline Integration Tests
//!
//! Wire messages flow through the parser, dispatcher, handlers, reconciler, and the
//! in-memory stores, the way the replay binary wires them:
//! - Partial then full fill of one buy order
//! - A sell that flattens a position
//! - Redelivered executions
//! - Truncated signal files
//! - Executions that overflow an order, and late fills after a cancel
//! - Events with no registered handler

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use trading_agent::application::ports::{
    DomainEventHandler, EventPublisherPort, PublishError, SignalError,
};
use trading_agent::application::services::ExecutionReconciler;
use trading_agent::application::state::StateStore;
use trading_agent::domain::events::{DomainEvent, DomainEventType};
use trading_agent::domain::order_execution::{
    NewOrder, Order, OrderRepository, OrderStatus, PositionAccountType, TradeType,
};
use trading_agent::domain::position::{Position, PositionKey, PositionRepository};
use trading_agent::domain::shared::{OrderId, Symbol};
use trading_agent::infrastructure::dispatch::{
    Dispatcher, EventKind, ExecutionHandler, Ingestion, MessageOutcome, PriceHandler,
    StatusHandler,
};
use trading_agent::infrastructure::events::InMemoryEventPublisher;
use trading_agent::infrastructure::persistence::InMemoryRepository;
use trading_agent::infrastructure::protocol::encode_pairs;
use trading_agent::infrastructure::signals::read_signal_file;

// ============================================
// Harness
// ============================================

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<DomainEventType>>,
}

#[async_trait]
impl DomainEventHandler for Recorder {
    async fn handle(&self, event: &DomainEvent) -> Result<(), PublishError> {
        self.seen.lock().push(event.event_type());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

struct Pipeline {
    repo: Arc<InMemoryRepository>,
    state: Arc<StateStore>,
    recorder: Arc<Recorder>,
    ingestion: Ingestion,
}

fn pipeline() -> Pipeline {
    let repo = Arc::new(InMemoryRepository::new());
    let state = Arc::new(StateStore::new());
    let publisher = Arc::new(InMemoryEventPublisher::new());
    let recorder = Arc::new(Recorder::default());
    for event_type in DomainEventType::ALL {
        publisher.subscribe(event_type, Arc::clone(&recorder) as Arc<dyn DomainEventHandler>);
    }

    let reconciler = Arc::new(ExecutionReconciler::new(
        Arc::clone(&repo),
        publisher,
        Arc::clone(&state),
    ));
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register(EventKind::Execution, Arc::new(ExecutionHandler::new(reconciler)));
    dispatcher.register(
        EventKind::Feed,
        Arc::new(PriceHandler::new(Arc::clone(&state), &[Symbol::new("7203")])),
    );
    dispatcher.register(EventKind::Status, Arc::new(StatusHandler));

    Pipeline {
        repo,
        state,
        recorder,
        ingestion: Ingestion::new(dispatcher),
    }
}

fn seed_order(pipeline: &Pipeline, id: &str, side: TradeType, quantity: i64) {
    let order = Order::new(NewOrder::market(
        OrderId::new(id),
        Symbol::new("7203"),
        side,
        quantity,
        PositionAccountType::Cash,
    ))
    .unwrap();
    pipeline.repo.add_order(order.clone());
    pipeline.state.add_order(order);
}

fn execution_message(order_id: &str, seq: &str, side: &str, qty: &str, price: &str) -> Vec<u8> {
    encode_pairs(&[
        ("p_cmd", "EC"),
        ("p_ON", order_id),
        ("p_ENO", seq),
        ("p_IC", "7203"),
        ("p_ST", side),
        ("p_EXSR", qty),
        ("p_EXPR", price),
        ("p_EXDT", "20240105100000"),
    ])
}

fn cash_key() -> PositionKey {
    PositionKey::cash(Symbol::new("7203"))
}

// ============================================
// Reconciliation
// ============================================

#[tokio::test]
async fn partial_then_full_fill_averages_price() {
    let p = pipeline();
    seed_order(&p, "O1", TradeType::Buy, 100);

    let outcome = p
        .ingestion
        .process(&execution_message("O1", "1", "1", "60", "1000"))
        .await;
    assert_eq!(outcome, MessageOutcome::Dispatched(EventKind::Execution));

    let order = p.repo.find_by_id(&OrderId::new("O1")).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::PartiallyFilled);
    let position = p.repo.find_by_key(&cash_key()).await.unwrap().unwrap();
    assert_eq!(position.quantity(), 60);
    assert_eq!(position.average_price(), dec!(1000));

    p.ingestion
        .process(&execution_message("O1", "2", "1", "40", "1010"))
        .await;

    let order = p.repo.find_by_id(&OrderId::new("O1")).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Filled);
    let position = p.repo.find_by_key(&cash_key()).await.unwrap().unwrap();
    assert_eq!(position.quantity(), 100);
    assert_eq!(position.average_price(), dec!(1004));

    let cached = p.state.get_position(&cash_key()).unwrap();
    assert_eq!(cached.read().quantity(), 100);
    assert_eq!(
        p.state.get_order(&OrderId::new("O1")).unwrap().status(),
        OrderStatus::Filled
    );
}

#[tokio::test]
async fn sell_to_zero_removes_position() {
    let p = pipeline();
    let position = Position::open_long(cash_key(), dec!(1000), 100);
    p.repo.add_position(position.clone());
    p.state.update_positions(vec![position]);
    seed_order(&p, "S1", TradeType::Sell, 100);

    p.ingestion
        .process(&execution_message("S1", "1", "2", "100", "1200"))
        .await;

    assert!(p.repo.find_by_key(&cash_key()).await.unwrap().is_none());
    assert!(p.state.get_position(&cash_key()).is_none());
    assert!(!p.state.has_position(&Symbol::new("7203")));
    assert!(p.recorder.seen.lock().contains(&DomainEventType::PositionClosed));
}

#[tokio::test]
async fn redelivered_execution_is_applied_once() {
    let p = pipeline();
    seed_order(&p, "O1", TradeType::Buy, 100);

    let message = execution_message("O1", "1", "1", "60", "1000");
    p.ingestion.process(&message).await;
    let outcome = p.ingestion.process(&message).await;
    assert_eq!(outcome, MessageOutcome::Dispatched(EventKind::Execution));

    let order = p.repo.find_by_id(&OrderId::new("O1")).await.unwrap().unwrap();
    assert_eq!(order.executed_quantity(), 60);
    let position = p.repo.find_by_key(&cash_key()).await.unwrap().unwrap();
    assert_eq!(position.quantity(), 60);

    let executed = p
        .recorder
        .seen
        .lock()
        .iter()
        .filter(|t| **t == DomainEventType::OrderExecuted)
        .count();
    assert_eq!(executed, 1);
}

#[tokio::test]
async fn overflowing_execution_fails_and_stream_continues() {
    let p = pipeline();
    seed_order(&p, "O1", TradeType::Buy, 100);

    p.ingestion
        .process(&execution_message("O1", "1", "1", "60", "1000"))
        .await;
    let outcome = p
        .ingestion
        .process(&execution_message("O1", "2", "1", &i64::MAX.to_string(), "1000"))
        .await;
    assert_eq!(outcome, MessageOutcome::HandlerFailed(EventKind::Execution));

    let order = p.repo.find_by_id(&OrderId::new("O1")).await.unwrap().unwrap();
    assert_eq!(order.executed_quantity(), 60);
    let position = p.repo.find_by_key(&cash_key()).await.unwrap().unwrap();
    assert_eq!(position.quantity(), 60);

    let outcome = p
        .ingestion
        .process(&execution_message("O1", "3", "1", "40", "1010"))
        .await;
    assert_eq!(outcome, MessageOutcome::Dispatched(EventKind::Execution));
    let order = p.repo.find_by_id(&OrderId::new("O1")).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Filled);
}

#[tokio::test]
async fn late_fill_after_cancel_keeps_symbol_open_for_entries() {
    let p = pipeline();
    let mut order = Order::new(NewOrder::market(
        OrderId::new("O1"),
        Symbol::new("7203"),
        TradeType::Buy,
        100,
        PositionAccountType::Cash,
    ))
    .unwrap();
    order.cancel().unwrap();
    p.repo.add_order(order.clone());
    p.state.add_order(order);

    let outcome = p
        .ingestion
        .process(&execution_message("O1", "1", "1", "30", "1000"))
        .await;
    assert_eq!(outcome, MessageOutcome::Dispatched(EventKind::Execution));

    assert_eq!(
        p.state.get_order(&OrderId::new("O1")).unwrap().status(),
        OrderStatus::Canceled
    );
    assert!(!p.state.has_unexecuted_order(&Symbol::new("7203"), None));
    assert_eq!(p.repo.find_by_key(&cash_key()).await.unwrap().unwrap().quantity(), 30);
}

#[tokio::test]
async fn execution_for_unknown_order_is_dropped() {
    let p = pipeline();
    let outcome = p
        .ingestion
        .process(&execution_message("GHOST", "1", "1", "10", "1000"))
        .await;

    assert_eq!(outcome, MessageOutcome::Dispatched(EventKind::Execution));
    assert!(p.repo.is_empty());
}

#[tokio::test]
async fn stream_run_mixes_prices_and_executions() {
    let p = pipeline();
    seed_order(&p, "O1", TradeType::Buy, 100);

    let (tx, rx) = mpsc::channel(16);
    tx.send(encode_pairs(&[("p_cmd", "KP")])).await.unwrap();
    tx.send(encode_pairs(&[("p_cmd", "FD"), ("p_1_DPP", "1005")]))
        .await
        .unwrap();
    tx.send(execution_message("O1", "1", "1", "100", "1000"))
        .await
        .unwrap();
    tx.send(b"\x01\x01".to_vec()).await.unwrap();
    drop(tx);

    let stats = p.ingestion.run(rx, CancellationToken::new()).await;

    assert_eq!(stats.received, 4);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.parse_errors, 1);
    assert_eq!(p.state.get_price(&Symbol::new("7203")), Some(dec!(1005)));
    assert_eq!(p.repo.position_count(), 1);
}

// ============================================
// Signal files
// ============================================

#[test]
fn truncated_signal_file_is_incomplete_record() {
    use std::io::Write;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&7203u16.to_le_bytes()).unwrap();

    let err = read_signal_file(file.path()).unwrap_err();
    assert!(matches!(
        err,
        SignalError::IncompleteRecord {
            offset: 0,
            remaining: 2,
            ..
        }
    ));
}

// ============================================
// Dispatch
// ============================================

#[tokio::test]
async fn unregistered_kind_is_ignored() {
    let state = Arc::new(StateStore::new());
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register(
        EventKind::Feed,
        Arc::new(PriceHandler::new(Arc::clone(&state), &[Symbol::new("7203")])),
    );
    let ingestion = Ingestion::new(Arc::clone(&dispatcher));

    let outcome = ingestion
        .process(&execution_message("O1", "1", "1", "10", "1000"))
        .await;

    assert_eq!(outcome, MessageOutcome::Ignored);
    assert!(!dispatcher.has_handler(EventKind::Execution));
    assert!(state.get_orders().is_empty());
    assert!(state.get_positions().is_empty());
}
