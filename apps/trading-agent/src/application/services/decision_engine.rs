//! Decision Engine
//!
//! Exit and entry evaluation for one tick. Reads the state store, asks the trade
//! service for price history when it needs an ATR, and places market orders through the
//! trade service. Every placed order is added to the state store at once so the next
//! check in the same tick sees it.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::application::ports::{
    EventPublisherPort, PlaceOrderRequest, SignalSource, TradeError, TradeService,
};
use crate::application::state::StateStore;
use crate::domain::events::DomainEvent;
use crate::domain::market::{IndicatorError, SignalAction, TradeSignal, average_true_range};
use crate::domain::order_execution::{Order, PositionAccountType, TradeType};
use crate::domain::position::{Position, PositionKey, PositionType};
use crate::domain::shared::{OrderId, Symbol};

/// Strategy parameters, rates already converted to decimals.
///
/// Percentages (`*_rate`) are in percent; fractions (`*_percentage`) are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyParams {
    /// Symbols the strategy may trade.
    pub target_symbols: Vec<Symbol>,
    /// Fraction of buying power risked per trade.
    pub trade_risk_percentage: Decimal,
    /// Cap on a single position as a fraction of buying power.
    pub max_position_size_percentage: Decimal,
    /// Trading lot.
    pub unit_size: i64,
    /// Profit-take distance above the average price, percent.
    pub profit_take_rate: Decimal,
    /// Fixed stop distance below the average price, percent. Zero disables it.
    pub stop_loss_rate: Decimal,
    /// Gain that arms the trailing stop, percent.
    pub trailing_stop_trigger_rate: Decimal,
    /// Trailing stop distance below the highest price, percent.
    pub trailing_stop_rate: Decimal,
    /// ATR lookback.
    pub atr_period: usize,
    /// ATR multiple for the stop distance.
    pub stop_loss_atr_multiplier: Decimal,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            target_symbols: Vec::new(),
            trade_risk_percentage: Decimal::new(2, 2),
            max_position_size_percentage: Decimal::new(25, 2),
            unit_size: 100,
            profit_take_rate: Decimal::TEN,
            stop_loss_rate: Decimal::ZERO,
            trailing_stop_trigger_rate: Decimal::from(5),
            trailing_stop_rate: Decimal::from(3),
            atr_period: 14,
            stop_loss_atr_multiplier: Decimal::TWO,
        }
    }
}

impl StrategyParams {
    /// True if `symbol` is in the target list.
    #[must_use]
    pub fn is_target(&self, symbol: &Symbol) -> bool {
        self.target_symbols.contains(symbol)
    }
}

/// Why an exit order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Price fell an ATR multiple below the average.
    AtrStopLoss,
    /// Price fell a fixed percentage below the average.
    RateStopLoss,
    /// Price fell to the trailing stop.
    TrailingStop,
    /// Price reached the profit target.
    ProfitTake,
}

impl ExitReason {
    /// Reason name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AtrStopLoss => "STOP_LOSS_ATR",
            Self::RateStopLoss => "STOP_LOSS_RATE",
            Self::TrailingStop => "STOP_LOSS_TRAILING",
            Self::ProfitTake => "PROFIT_TAKE",
        }
    }
}

/// Orders placed during one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionReport {
    /// Exit orders placed.
    pub exits: Vec<Order>,
    /// Entry orders placed (buys and signal-driven sells).
    pub entries: Vec<Order>,
}

#[derive(Debug, thiserror::Error)]
enum AtrUnavailable {
    #[error("price history request failed: {0}")]
    History(#[from] TradeError),
    #[error("price history request timed out")]
    Timeout,
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error("ATR is zero")]
    Zero,
}

/// Lot-rounded entry quantity.
///
/// With an ATR the quantity is the smallest of the ATR risk budget, what buying power
/// can pay for, and the per-position cap. Without one it is `bp * risk / price`. The
/// result is floored to a multiple of `unit_size`; zero means no order.
#[must_use]
pub fn entry_quantity(
    buying_power: Decimal,
    price: Decimal,
    atr: Option<Decimal>,
    params: &StrategyParams,
) -> i64 {
    if price <= Decimal::ZERO || buying_power <= Decimal::ZERO || params.unit_size <= 0 {
        return 0;
    }

    let risk_amount = buying_power * params.trade_risk_percentage;
    let risk_per_share = atr.map(|atr| atr * params.stop_loss_atr_multiplier);

    let shares = match risk_per_share {
        Some(per_share) if per_share > Decimal::ZERO => {
            let by_atr = risk_amount / per_share;
            let by_buying_power = buying_power / price;
            let by_cap = buying_power * params.max_position_size_percentage / price;
            by_atr.min(by_buying_power).min(by_cap)
        }
        _ => risk_amount / price,
    };

    let lot = Decimal::from(params.unit_size);
    ((shares / lot).floor() * lot).to_i64().unwrap_or(0)
}

/// Account type for an order that closes `position`.
const fn closing_account_type(position: &Position) -> PositionAccountType {
    match position.account_type() {
        PositionAccountType::Cash => PositionAccountType::Cash,
        PositionAccountType::MarginNew | PositionAccountType::MarginRepay => {
            PositionAccountType::MarginRepay
        }
    }
}

fn percent(rate: Decimal) -> Decimal {
    rate / Decimal::ONE_HUNDRED
}

/// Exit and entry decisions against the shared state.
pub struct DecisionEngine<T, G, E>
where
    T: TradeService,
    G: SignalSource,
    E: EventPublisherPort,
{
    trade: Arc<T>,
    signals: Arc<G>,
    publisher: Arc<E>,
    state: Arc<StateStore>,
    params: StrategyParams,
    call_timeout: Duration,
}

impl<T, G, E> DecisionEngine<T, G, E>
where
    T: TradeService,
    G: SignalSource,
    E: EventPublisherPort,
{
    /// Default deadline for a single trade service call.
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a new decision engine.
    pub const fn new(
        trade: Arc<T>,
        signals: Arc<G>,
        publisher: Arc<E>,
        state: Arc<StateStore>,
        params: StrategyParams,
    ) -> Self {
        Self {
            trade,
            signals,
            publisher,
            state,
            params,
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the per-call deadline.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Strategy parameters.
    pub const fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Run exits, then entries.
    pub async fn evaluate(&self) -> DecisionReport {
        let exits = self.evaluate_exits().await;
        let entries = self.evaluate_entries().await;
        DecisionReport { exits, entries }
    }

    // ========================================================================
    // Exits
    // ========================================================================

    /// Check every held long position against the exit rules.
    pub async fn evaluate_exits(&self) -> Vec<Order> {
        let mut placed = Vec::new();

        for handle in self.state.get_positions() {
            let snapshot = handle.read().clone();
            let symbol = snapshot.symbol().clone();

            if snapshot.position_type() == PositionType::Short {
                tracing::debug!(symbol = %symbol, "Skipping exit check for short position");
                continue;
            }
            if self.state.has_unexecuted_order(&symbol, Some(TradeType::Sell)) {
                tracing::info!(symbol = %symbol, "Skipping exit check, sell order already open");
                continue;
            }
            let price = match self.state.get_price(&symbol) {
                Some(price) if price > Decimal::ZERO => price,
                Some(_) => {
                    tracing::warn!(symbol = %symbol, "Skipping exit check, price is zero");
                    continue;
                }
                None => {
                    tracing::warn!(symbol = %symbol, "Skipping exit check, no price");
                    continue;
                }
            };

            self.update_trailing_stop(&snapshot, price).await;
            let position = handle.read().clone();

            let Some(reason) = self.exit_reason(&position, price).await else {
                continue;
            };

            let request = PlaceOrderRequest::market(
                symbol.clone(),
                TradeType::Sell,
                position.quantity(),
                closing_account_type(&position),
            );
            if let Some(order) = self.place(request, reason.as_str()).await {
                placed.push(order);
            }
        }

        placed
    }

    /// Raise the highest price and arm or ratchet the trailing stop.
    ///
    /// Changes land in the state store at once and are written through to the trade
    /// service, whose next positions snapshot would otherwise drop them.
    async fn update_trailing_stop(&self, position: &Position, price: Decimal) {
        let key = position.key();
        let mut highest = position.highest_price();
        let mut stop_price = position.trailing_stop_price();
        let mut changed = false;

        if price > highest && self.state.update_position_highest_price(key, price) {
            highest = price;
            changed = true;
        }

        let stop = highest * (Decimal::ONE - percent(self.params.trailing_stop_rate));
        let trigger =
            position.average_price() * (Decimal::ONE + percent(self.params.trailing_stop_trigger_rate));

        if !position.has_trailing_stop() {
            if price >= trigger {
                self.state.update_position_trailing_stop_price(key, stop);
                stop_price = stop;
                changed = true;
                tracing::info!(
                    symbol = %key.symbol,
                    trigger_price = %trigger,
                    stop_price = %stop,
                    "Trailing stop activated"
                );
            }
        } else if stop > position.trailing_stop_price() {
            self.state.update_position_trailing_stop_price(key, stop);
            stop_price = stop;
            changed = true;
            tracing::info!(symbol = %key.symbol, stop_price = %stop, "Trailing stop raised");
        }

        if changed {
            self.persist_tracking(key, highest, stop_price).await;
        }
    }

    async fn persist_tracking(&self, key: &PositionKey, highest: Decimal, stop: Decimal) {
        let call = self.trade.update_position_tracking(key, highest, stop);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(position = %key, error = %e, "Failed to persist trailing stop");
            }
            Err(_) => {
                tracing::warn!(position = %key, "Persisting trailing stop timed out");
            }
        }
    }

    async fn exit_reason(&self, position: &Position, price: Decimal) -> Option<ExitReason> {
        let symbol = position.symbol();
        let average = position.average_price();

        match self.atr(symbol).await {
            Ok(atr) => {
                let stop = average - atr * self.params.stop_loss_atr_multiplier;
                if price <= stop {
                    tracing::info!(
                        symbol = %symbol,
                        average_price = %average,
                        current_price = %price,
                        stop_price = %stop,
                        atr = %atr,
                        "ATR stop-loss reached"
                    );
                    return Some(ExitReason::AtrStopLoss);
                }
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "ATR unavailable, skipping ATR stop");
            }
        }

        if self.params.stop_loss_rate > Decimal::ZERO {
            let stop = average * (Decimal::ONE - percent(self.params.stop_loss_rate));
            if price <= stop {
                tracing::info!(
                    symbol = %symbol,
                    average_price = %average,
                    current_price = %price,
                    stop_price = %stop,
                    "Rate stop-loss reached"
                );
                return Some(ExitReason::RateStopLoss);
            }
        }

        if position.has_trailing_stop() && price <= position.trailing_stop_price() {
            tracing::info!(
                symbol = %symbol,
                highest_price = %position.highest_price(),
                current_price = %price,
                stop_price = %position.trailing_stop_price(),
                "Trailing stop reached"
            );
            return Some(ExitReason::TrailingStop);
        }

        let target = average * (Decimal::ONE + percent(self.params.profit_take_rate));
        if price >= target {
            tracing::info!(
                symbol = %symbol,
                average_price = %average,
                current_price = %price,
                target_price = %target,
                "Profit target reached"
            );
            return Some(ExitReason::ProfitTake);
        }

        None
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Act on the latest signal batch.
    pub async fn evaluate_entries(&self) -> Vec<Order> {
        let signals = match self.signals.latest_signals().await {
            Ok(signals) => signals,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read signals");
                return Vec::new();
            }
        };
        if signals.is_empty() {
            tracing::debug!("No signals");
            return Vec::new();
        }
        tracing::info!(count = signals.len(), "Signals loaded");

        let mut placed = Vec::new();
        for signal in signals {
            if !self.params.is_target(&signal.symbol) {
                tracing::debug!(symbol = %signal.symbol, "Skipping signal for non-target symbol");
                continue;
            }
            if self.state.has_unexecuted_order(&signal.symbol, None) {
                tracing::info!(symbol = %signal.symbol, "Skipping signal, order already open");
                continue;
            }

            match signal.action {
                SignalAction::Buy => {
                    if let Some(order) = self.enter(&signal).await {
                        placed.push(order);
                    }
                }
                SignalAction::Sell => placed.extend(self.sell_held(&signal).await),
            }
        }
        placed
    }

    async fn enter(&self, signal: &TradeSignal) -> Option<Order> {
        let symbol = &signal.symbol;
        if self.state.has_position(symbol) {
            tracing::info!(symbol = %symbol, "Skipping buy signal, position already held");
            return None;
        }
        let price = match self.state.get_price(symbol) {
            Some(price) if price > Decimal::ZERO => price,
            _ => {
                tracing::warn!(symbol = %symbol, "Skipping buy signal, no usable price");
                return None;
            }
        };

        let atr = match self.atr(symbol).await {
            Ok(atr) => Some(atr),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "ATR unavailable, using basic sizing");
                None
            }
        };

        let buying_power = self.state.get_balance().buying_power;
        let quantity = entry_quantity(buying_power, price, atr, &self.params);
        tracing::info!(
            symbol = %symbol,
            buying_power = %buying_power,
            price = %price,
            atr = ?atr,
            quantity,
            "Entry sized"
        );
        if quantity < self.params.unit_size {
            tracing::info!(symbol = %symbol, quantity, "Skipping buy signal, size below one lot");
            return None;
        }

        let request = PlaceOrderRequest::market(
            symbol.clone(),
            TradeType::Buy,
            quantity,
            PositionAccountType::Cash,
        );
        self.place(request, "SIGNAL_BUY").await
    }

    async fn sell_held(&self, signal: &TradeSignal) -> Vec<Order> {
        let held: Vec<Position> = self
            .state
            .positions_for_symbol(&signal.symbol)
            .iter()
            .map(|handle| handle.read().clone())
            .filter(|position| position.position_type() == PositionType::Long)
            .collect();

        if held.is_empty() {
            tracing::info!(symbol = %signal.symbol, "Skipping sell signal, nothing held");
            return Vec::new();
        }

        let mut placed = Vec::new();
        for position in held {
            let request = PlaceOrderRequest::market(
                signal.symbol.clone(),
                TradeType::Sell,
                position.quantity(),
                closing_account_type(&position),
            );
            if let Some(order) = self.place(request, "SIGNAL_SELL").await {
                placed.push(order);
            }
        }
        placed
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Cancel an order through the trade service.
    ///
    /// # Errors
    ///
    /// Returns the trade service error, or [`TradeError::Timeout`] past the deadline.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<(), TradeError> {
        tokio::time::timeout(self.call_timeout, self.trade.cancel_order(order_id))
            .await
            .map_err(|_| TradeError::Timeout {
                seconds: self.call_timeout.as_secs(),
            })??;

        if let Some(existing) = self.state.get_order(order_id) {
            let mut order = (*existing).clone();
            match order.cancel() {
                Ok(()) => self.state.add_order(order),
                Err(e) => tracing::warn!(order_id = %order_id, error = %e, "Cancelled order was terminal"),
            }
        }

        tracing::info!(order_id = %order_id, "Order cancelled");
        self.publish(DomainEvent::order_cancelled(order_id)).await;
        Ok(())
    }

    async fn place(&self, request: PlaceOrderRequest, reason: &str) -> Option<Order> {
        let symbol = request.symbol.clone();
        let side = request.trade_type;
        let quantity = request.quantity;

        let result = tokio::time::timeout(self.call_timeout, self.trade.place_order(request)).await;
        match result {
            Ok(Ok(order)) => {
                tracing::info!(
                    order_id = %order.id(),
                    symbol = %symbol,
                    side = %side,
                    quantity,
                    reason,
                    "Order placed"
                );
                self.state.add_order(order.clone());
                self.publish(DomainEvent::order_placed(&order)).await;
                Some(order)
            }
            Ok(Err(e)) => {
                tracing::error!(symbol = %symbol, side = %side, quantity, reason, error = %e, "Order placement failed");
                None
            }
            Err(_) => {
                tracing::error!(symbol = %symbol, side = %side, reason, "Order placement timed out");
                None
            }
        }
    }

    async fn atr(&self, symbol: &Symbol) -> Result<Decimal, AtrUnavailable> {
        let period = self.params.atr_period;
        let history = tokio::time::timeout(
            self.call_timeout,
            self.trade.get_price_history(symbol, period + 1),
        )
        .await
        .map_err(|_| AtrUnavailable::Timeout)??;

        let atr = average_true_range(&history, period)?;
        if atr.is_zero() {
            return Err(AtrUnavailable::Zero);
        }
        Ok(atr)
    }

    async fn publish(&self, event: DomainEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.publisher.publish(event).await {
            tracing::warn!(event_type = %event_type, error = %e, "Domain event publish failed");
        }
    }
}
