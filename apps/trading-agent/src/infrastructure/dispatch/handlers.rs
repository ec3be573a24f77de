//! Stream event handlers: execution reports, price feed, status notifications.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use super::dispatcher::{EventHandler, EventKind, HandlerError};
use crate::application::ports::EventPublisherPort;
use crate::application::services::{ExecutionReconciler, ReconcileError, ReconcileOutcome};
use crate::application::state::StateStore;
use crate::domain::order_execution::{Execution, ReconciliationStore, TradeType};
use crate::domain::shared::{ExecutionId, OrderId, Symbol};
use crate::infrastructure::protocol::Fields;

const ORDER_ID: &str = "p_ON";
const EXECUTION_NO: &str = "p_ENO";
const SYMBOL: &str = "p_IC";
const SIDE: &str = "p_ST";
const QUANTITY: &str = "p_EXSR";
const PRICE: &str = "p_EXPR";
const EXECUTED_AT: &str = "p_EXDT";

/// Naive layouts accepted for `p_EXDT`, read as UTC.
const EXECUTED_AT_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M%S"];

fn required<'a>(fields: &'a Fields, field: &'static str) -> Result<&'a str, HandlerError> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or(HandlerError::MissingField {
            kind: EventKind::Execution,
            field,
        })
}

fn invalid(field: &'static str, value: &str, reason: impl ToString) -> HandlerError {
    HandlerError::InvalidField {
        kind: EventKind::Execution,
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_executed_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    EXECUTED_AT_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .map(|naive| naive.and_utc())
}

/// Decode an `EC` message into an [`Execution`].
///
/// The execution ID is `{p_ON}-{p_ENO}`, or `p_ON` alone when there is no sequence
/// number. A missing `p_EXDT` falls back to the current time.
///
/// # Errors
///
/// [`HandlerError::MissingField`] or [`HandlerError::InvalidField`] for any required
/// field that is absent or cannot be decoded.
pub fn decode_execution(fields: &Fields) -> Result<Execution, HandlerError> {
    let order_id = OrderId::new(required(fields, ORDER_ID)?);
    let execution_id =
        ExecutionId::derive(&order_id, fields.get(EXECUTION_NO).map(String::as_str));
    let symbol = Symbol::new(required(fields, SYMBOL)?);

    let side = required(fields, SIDE)?;
    let trade_type =
        TradeType::from_broker_code(side).ok_or_else(|| invalid(SIDE, side, "expected 1 or 2"))?;

    let raw_qty = required(fields, QUANTITY)?;
    let quantity = raw_qty
        .trim()
        .parse::<i64>()
        .map_err(|e| invalid(QUANTITY, raw_qty, e))?;

    let raw_price = required(fields, PRICE)?;
    let price = raw_price
        .trim()
        .parse::<Decimal>()
        .map_err(|e| invalid(PRICE, raw_price, e))?;

    let executed_at = match fields.get(EXECUTED_AT) {
        Some(raw) => {
            parse_executed_at(raw).ok_or_else(|| invalid(EXECUTED_AT, raw, "unrecognized layout"))?
        }
        None => {
            tracing::warn!(order_id = %order_id, "EC event missing p_EXDT, using current time");
            Utc::now()
        }
    };

    Ok(Execution::new(
        execution_id,
        order_id,
        symbol,
        trade_type,
        quantity,
        price,
        executed_at,
    ))
}

/// Decodes `EC` messages and reconciles them.
pub struct ExecutionHandler<S, E>
where
    S: ReconciliationStore,
    E: EventPublisherPort,
{
    reconciler: Arc<ExecutionReconciler<S, E>>,
}

impl<S, E> ExecutionHandler<S, E>
where
    S: ReconciliationStore,
    E: EventPublisherPort,
{
    /// Create a handler that feeds `reconciler`.
    pub const fn new(reconciler: Arc<ExecutionReconciler<S, E>>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl<S, E> EventHandler for ExecutionHandler<S, E>
where
    S: ReconciliationStore + 'static,
    E: EventPublisherPort + 'static,
{
    async fn handle(&self, kind: EventKind, fields: &Fields) -> Result<(), HandlerError> {
        if kind != EventKind::Execution {
            return Err(HandlerError::UnsupportedKind {
                handler: self.name(),
                kind,
            });
        }

        let execution = decode_execution(fields)?;
        let execution_id = execution.execution_id.clone();
        let order_id = execution.order_id.clone();

        match self.reconciler.reconcile(execution).await {
            Ok(ReconcileOutcome::Applied { order_status, .. }) => {
                tracing::debug!(
                    execution_id = %execution_id,
                    order_id = %order_id,
                    status = %order_status,
                    "Execution processed"
                );
                Ok(())
            }
            Ok(ReconcileOutcome::Duplicate) => Ok(()),
            Err(ReconcileError::OrderNotFound { order_id }) => {
                tracing::warn!(
                    execution_id = %execution_id,
                    order_id = %order_id,
                    "Execution for unknown order ignored"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "execution"
    }
}

/// Applies `FD` price updates to the state store.
///
/// Prices arrive as `p_{row}_DPP`, where `row` is the 1-based position of the symbol
/// in the subscription list.
pub struct PriceHandler {
    state: Arc<StateStore>,
    rows: HashMap<String, Symbol>,
}

impl PriceHandler {
    /// Create a handler for the symbols subscribed in `targets` order.
    pub fn new(state: Arc<StateStore>, targets: &[Symbol]) -> Self {
        let rows = targets
            .iter()
            .enumerate()
            .map(|(i, symbol)| ((i + 1).to_string(), symbol.clone()))
            .collect();
        Self { state, rows }
    }

    fn row_of(key: &str) -> Option<&str> {
        let row = key.strip_prefix("p_")?.strip_suffix("_DPP")?;
        (!row.is_empty() && !row.contains('_')).then_some(row)
    }
}

#[async_trait]
impl EventHandler for PriceHandler {
    async fn handle(&self, kind: EventKind, fields: &Fields) -> Result<(), HandlerError> {
        if kind != EventKind::Feed {
            return Err(HandlerError::UnsupportedKind {
                handler: self.name(),
                kind,
            });
        }

        for (key, value) in fields {
            let Some(row) = Self::row_of(key) else {
                continue;
            };
            let Some(symbol) = self.rows.get(row) else {
                tracing::warn!(row, key = %key, "Unknown row in price feed");
                continue;
            };
            match value.trim().parse::<Decimal>() {
                Ok(price) => {
                    tracing::debug!(symbol = %symbol, %price, "Price updated from feed");
                    self.state.update_price(symbol.clone(), price);
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, key = %key, value = %value, error = %e, "Unparsable price in feed");
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "price"
    }
}

/// Logs `ST` status notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusHandler;

#[async_trait]
impl EventHandler for StatusHandler {
    async fn handle(&self, kind: EventKind, fields: &Fields) -> Result<(), HandlerError> {
        if kind != EventKind::Status {
            return Err(HandlerError::UnsupportedKind {
                handler: self.name(),
                kind,
            });
        }
        tracing::warn!(fields = ?fields, "Unhandled status notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "status"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NoOpEventPublisher;
    use crate::domain::order_execution::{NewOrder, Order, OrderStatus, PositionAccountType};
    use crate::domain::position::PositionKey;
    use crate::infrastructure::persistence::InMemoryRepository;
    use chrono::{Datelike, Timelike};
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn ec_fields(order_id: &str, seq: &str, side: &str, qty: &str, price: &str) -> Fields {
        fields(&[
            ("p_cmd", "EC"),
            ("p_ON", order_id),
            ("p_ENO", seq),
            ("p_IC", "7203"),
            ("p_ST", side),
            ("p_EXSR", qty),
            ("p_EXPR", price),
            ("p_EXDT", "20240115093000"),
        ])
    }

    #[test]
    fn decode_full_execution() {
        let exec = decode_execution(&ec_fields("31000001", "2", "1", "60", "1000.5")).unwrap();

        assert_eq!(exec.execution_id.as_str(), "31000001-2");
        assert_eq!(exec.order_id.as_str(), "31000001");
        assert_eq!(exec.symbol.as_str(), "7203");
        assert_eq!(exec.trade_type, TradeType::Buy);
        assert_eq!(exec.quantity, 60);
        assert_eq!(exec.price, dec!(1000.5));
        assert_eq!(exec.commission, Decimal::ZERO);
        assert_eq!(exec.executed_at.year(), 2024);
        assert_eq!(exec.executed_at.hour(), 9);
    }

    #[test]
    fn decode_without_sequence_uses_order_id() {
        let mut f = ec_fields("31000001", "1", "2", "100", "1200");
        f.remove("p_ENO");
        let exec = decode_execution(&f).unwrap();
        assert_eq!(exec.execution_id.as_str(), "31000001");
        assert_eq!(exec.trade_type, TradeType::Sell);
    }

    #[test]
    fn decode_without_timestamp_uses_now() {
        let mut f = ec_fields("O1", "1", "1", "100", "1000");
        f.remove("p_EXDT");
        let before = Utc::now();
        let exec = decode_execution(&f).unwrap();
        assert!(exec.executed_at >= before);
    }

    #[test_case("2024-01-15T09:30:00+09:00", 0 ; "rfc3339 with offset")]
    #[test_case("2024-01-15 09:30:00", 9 ; "dashed")]
    #[test_case("20240115093000", 9 ; "compact")]
    fn decode_timestamp_layouts(raw: &str, hour: u32) {
        let mut f = ec_fields("O1", "1", "1", "100", "1000");
        f.insert("p_EXDT".to_string(), raw.to_string());
        assert_eq!(decode_execution(&f).unwrap().executed_at.hour(), hour);
    }

    #[test_case("p_ON" ; "order id")]
    #[test_case("p_IC" ; "symbol")]
    #[test_case("p_ST" ; "side")]
    #[test_case("p_EXSR" ; "quantity")]
    #[test_case("p_EXPR" ; "price")]
    fn decode_missing_field(field: &'static str) {
        let mut f = ec_fields("O1", "1", "1", "100", "1000");
        f.remove(field);
        let err = decode_execution(&f).unwrap_err();
        assert_eq!(
            err,
            HandlerError::MissingField {
                kind: EventKind::Execution,
                field
            }
        );
    }

    #[test_case("p_ST", "3" ; "bad side")]
    #[test_case("p_EXSR", "ten" ; "bad quantity")]
    #[test_case("p_EXPR", "1,000" ; "bad price")]
    #[test_case("p_EXDT", "15/01/2024" ; "bad timestamp")]
    fn decode_invalid_field(field: &'static str, value: &str) {
        let mut f = ec_fields("O1", "1", "1", "100", "1000");
        f.insert(field.to_string(), value.to_string());
        let err = decode_execution(&f).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidField { field: actual, .. } if actual == field));
    }

    fn execution_handler() -> (
        Arc<InMemoryRepository>,
        Arc<StateStore>,
        ExecutionHandler<InMemoryRepository, NoOpEventPublisher>,
    ) {
        let repo = Arc::new(InMemoryRepository::new());
        let state = Arc::new(StateStore::new());
        let reconciler = Arc::new(ExecutionReconciler::new(
            Arc::clone(&repo),
            Arc::new(NoOpEventPublisher),
            Arc::clone(&state),
        ));
        (repo, state, ExecutionHandler::new(reconciler))
    }

    #[tokio::test]
    async fn execution_handler_reconciles() {
        let (repo, state, handler) = execution_handler();
        repo.add_order(
            Order::new(NewOrder::market(
                OrderId::new("O1"),
                Symbol::new("7203"),
                TradeType::Buy,
                100,
                PositionAccountType::Cash,
            ))
            .unwrap(),
        );

        handler
            .handle(EventKind::Execution, &ec_fields("O1", "1", "1", "100", "1000"))
            .await
            .unwrap();

        let order = state.get_order(&OrderId::new("O1")).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        let position = state.get_position(&PositionKey::cash(Symbol::new("7203"))).unwrap();
        assert_eq!(position.read().quantity(), 100);
    }

    #[tokio::test]
    async fn execution_handler_unknown_order_is_ok() {
        let (_repo, state, handler) = execution_handler();
        handler
            .handle(EventKind::Execution, &ec_fields("NOPE", "1", "1", "100", "1000"))
            .await
            .unwrap();
        assert!(state.get_positions().is_empty());
    }

    #[tokio::test]
    async fn execution_handler_integrity_error_propagates() {
        let (repo, state, handler) = execution_handler();
        repo.add_order(
            Order::new(NewOrder::market(
                OrderId::new("S1"),
                Symbol::new("7203"),
                TradeType::Sell,
                100,
                PositionAccountType::Cash,
            ))
            .unwrap(),
        );

        let err = handler
            .handle(EventKind::Execution, &ec_fields("S1", "1", "2", "100", "1200"))
            .await
            .unwrap_err();
        assert!(err.is_integrity());
        assert!(state.get_positions().is_empty());
    }

    #[tokio::test]
    async fn execution_handler_rejects_other_kinds() {
        let (_repo, _state, handler) = execution_handler();
        let err = handler.handle(EventKind::Feed, &Fields::new()).await.unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedKind { .. }));
    }

    #[tokio::test]
    async fn price_handler_updates_known_rows() {
        let state = Arc::new(StateStore::new());
        let handler = PriceHandler::new(
            Arc::clone(&state),
            &[Symbol::new("7203"), Symbol::new("6758")],
        );

        handler
            .handle(
                EventKind::Feed,
                &fields(&[
                    ("p_cmd", "FD"),
                    ("p_1_DPP", "2500.5"),
                    ("p_2_DPP", "bad"),
                    ("p_9_DPP", "100"),
                    ("p_1_DPP_X", "1"),
                    ("p_no", "3"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(state.get_price(&Symbol::new("7203")), Some(dec!(2500.5)));
        assert_eq!(state.get_price(&Symbol::new("6758")), None);
    }

    #[test_case("p_1_DPP", Some("1"))]
    #[test_case("p_12_DPP", Some("12"))]
    #[test_case("p__DPP", None)]
    #[test_case("p_1_2_DPP", None)]
    #[test_case("p_1_DPZ", None)]
    fn price_row_of(key: &str, expected: Option<&str>) {
        assert_eq!(PriceHandler::row_of(key), expected);
    }

    #[tokio::test]
    async fn status_handler_accepts_status() {
        let handler = StatusHandler;
        assert!(handler.handle(EventKind::Status, &Fields::new()).await.is_ok());
        assert!(handler.handle(EventKind::Feed, &Fields::new()).await.is_err());
    }
}
