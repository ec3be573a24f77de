//! Backtest trade service: the trade contract replayed against daily OHLC history.
//!
//! Every order fills immediately and in full at the close of the current tick. Orders
//! that would overspend buying power or oversell a position are rejected before they
//! are recorded.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::history::{HistoryError, PriceHistoryReader};
use crate::application::ports::{PlaceOrderRequest, TradeError, TradeService};
use crate::domain::account::Balance;
use crate::domain::market::PriceBar;
use crate::domain::order_execution::{Execution, NewOrder, Order, TradeType};
use crate::domain::position::{Position, PositionChange, PositionKey, apply_execution};
use crate::domain::shared::{ExecutionId, OrderId, Symbol};

fn rejected(e: impl std::fmt::Display) -> TradeError {
    TradeError::OrderRejected {
        reason: e.to_string(),
    }
}

#[derive(Debug, Default)]
struct Book {
    tick: Option<NaiveDate>,
    balance: Balance,
    positions: HashMap<PositionKey, Position>,
    orders: Vec<Order>,
    next_order: u64,
}

/// Simulated broker over loaded price history.
#[derive(Debug)]
pub struct BacktestTradeService {
    history: HashMap<Symbol, Vec<PriceBar>>,
    book: Mutex<Book>,
}

impl BacktestTradeService {
    /// Create a simulator holding `initial_cash` as both cash and buying power.
    #[must_use]
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            history: HashMap::new(),
            book: Mutex::new(Book {
                balance: Balance::all_cash(initial_cash),
                ..Book::default()
            }),
        }
    }

    /// Add `bars` for `symbol`, replacing any loaded before. Bars are sorted by date.
    pub fn insert_history(&mut self, symbol: Symbol, mut bars: Vec<PriceBar>) {
        bars.sort_by_key(|bar| bar.date);
        self.history.insert(symbol, bars);
    }

    /// Load history files for `symbols` through `reader`.
    ///
    /// # Errors
    ///
    /// Returns the first [`HistoryError`].
    pub fn load_history(
        &mut self,
        reader: &PriceHistoryReader,
        symbols: &[Symbol],
    ) -> Result<(), HistoryError> {
        for symbol in symbols {
            let bars = reader.read(symbol)?;
            self.insert_history(symbol.clone(), bars);
        }
        Ok(())
    }

    /// Every date present in any loaded history, ascending.
    #[must_use]
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .history
            .values()
            .flat_map(|bars| bars.iter().map(|bar| bar.date))
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Advance simulated time.
    pub fn set_current_tick(&self, date: NaiveDate) {
        self.book.lock().tick = Some(date);
    }

    /// Current simulated date.
    #[must_use]
    pub fn current_tick(&self) -> Option<NaiveDate> {
        self.book.lock().tick
    }

    /// Balance without going through the async contract.
    #[must_use]
    pub fn balance(&self) -> Balance {
        self.book.lock().balance
    }

    /// Positions held, ordered by key.
    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.book.lock().positions.values().cloned().collect();
        positions.sort_by(|a, b| a.key().cmp(b.key()));
        positions
    }

    /// Number of orders filled so far.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.book.lock().orders.len()
    }

    /// Bars for `symbol` up to and including `tick`.
    fn bars_through(&self, symbol: &Symbol, tick: Option<NaiveDate>) -> &[PriceBar] {
        let Some(tick) = tick else {
            return &[];
        };
        self.history.get(symbol).map_or(&[], |bars| {
            let end = bars.partition_point(|bar| bar.date <= tick);
            &bars[..end]
        })
    }

    fn close_at(&self, symbol: &Symbol, tick: Option<NaiveDate>) -> Option<Decimal> {
        self.bars_through(symbol, tick).last().map(|bar| bar.close)
    }

    fn fill(&self, request: PlaceOrderRequest) -> Result<Order, TradeError> {
        if request.quantity <= 0 {
            return Err(TradeError::OrderRejected {
                reason: format!("quantity must be positive, got {}", request.quantity),
            });
        }

        let mut book = self.book.lock();
        let price = self
            .close_at(&request.symbol, book.tick)
            .ok_or_else(|| TradeError::PriceUnavailable {
                symbol: request.symbol.to_string(),
            })?;
        let cost = price
            .checked_mul(Decimal::from(request.quantity))
            .ok_or_else(|| TradeError::OrderRejected {
                reason: format!("{} shares at {price} overflows", request.quantity),
            })?;
        let key = PositionKey::new(request.symbol.clone(), request.account_type);

        match request.trade_type {
            TradeType::Buy if cost > book.balance.buying_power => {
                return Err(TradeError::InsufficientFunds {
                    symbol: request.symbol.to_string(),
                    required: cost,
                    available: book.balance.buying_power,
                });
            }
            TradeType::Sell => {
                let held = book.positions.get(&key).map_or(0, Position::quantity);
                if held < request.quantity {
                    return Err(TradeError::InsufficientPosition {
                        symbol: request.symbol.to_string(),
                        requested: request.quantity,
                        held,
                    });
                }
            }
            TradeType::Buy => {}
        }

        let mut balance = book.balance;
        let settled = match request.trade_type {
            TradeType::Buy => balance
                .cash
                .checked_sub(cost)
                .zip(balance.buying_power.checked_sub(cost)),
            TradeType::Sell => balance
                .cash
                .checked_add(cost)
                .zip(balance.buying_power.checked_add(cost)),
        };
        let Some((cash, buying_power)) = settled else {
            return Err(rejected(format!("settling {cost} overflows the balance")));
        };
        balance.cash = cash;
        balance.buying_power = buying_power;

        book.next_order += 1;
        let order_id = OrderId::new(format!("BT-ORDER-{}", book.next_order));
        let filled_at = book
            .tick
            .map_or_else(Utc::now, |d| d.and_time(NaiveTime::MIN).and_utc());

        let mut order = Order::new(NewOrder {
            order_id: order_id.clone(),
            symbol: request.symbol.clone(),
            trade_type: request.trade_type,
            order_type: request.order_type,
            quantity: request.quantity,
            price: request.price,
            trigger_price: request.trigger_price,
            time_in_force: request.time_in_force,
            account_type: request.account_type,
        })
        .map_err(rejected)?
        .with_created_at(filled_at);

        let execution = Execution::new(
            ExecutionId::derive(&order_id, Some("1")),
            order_id,
            request.symbol.clone(),
            request.trade_type,
            request.quantity,
            price,
            filled_at,
        );
        let change = apply_execution(book.positions.get(&key), &execution, request.account_type)
            .map_err(rejected)?;
        order.record_execution(execution).map_err(rejected)?;

        match change {
            PositionChange::Opened(position) | PositionChange::Updated(position) => {
                book.positions.insert(key, position);
            }
            PositionChange::Closed { .. } => {
                book.positions.remove(&key);
            }
        }
        book.balance = balance;

        tracing::debug!(
            order_id = %order.id(),
            symbol = %request.symbol,
            side = %request.trade_type,
            quantity = request.quantity,
            %price,
            "Backtest order filled"
        );
        book.orders.push(order.clone());
        Ok(order)
    }
}

#[async_trait]
impl TradeService for BacktestTradeService {
    async fn get_balance(&self) -> Result<Balance, TradeError> {
        Ok(self.balance())
    }

    async fn get_positions(&self) -> Result<Vec<Position>, TradeError> {
        Ok(self.positions())
    }

    async fn get_orders(&self) -> Result<Vec<Order>, TradeError> {
        Ok(self.book.lock().orders.clone())
    }

    async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, TradeError> {
        self.fill(request)
    }

    async fn cancel_order(&self, _order_id: &OrderId) -> Result<(), TradeError> {
        Err(TradeError::Unsupported {
            operation: "cancel_order in backtest".to_string(),
        })
    }

    async fn update_position_tracking(
        &self,
        key: &PositionKey,
        highest_price: Decimal,
        trailing_stop_price: Decimal,
    ) -> Result<(), TradeError> {
        let mut book = self.book.lock();
        let position = book
            .positions
            .get_mut(key)
            .ok_or_else(|| TradeError::PositionNotFound {
                key: key.to_string(),
            })?;
        position.raise_highest_price(highest_price);
        position.set_trailing_stop_price(trailing_stop_price);
        Ok(())
    }

    async fn get_price_history(
        &self,
        symbol: &Symbol,
        days: usize,
    ) -> Result<Vec<PriceBar>, TradeError> {
        let tick = self.current_tick();
        let bars = self.bars_through(symbol, tick);
        if bars.is_empty() {
            return Err(TradeError::PriceUnavailable {
                symbol: symbol.to_string(),
            });
        }
        let start = bars.len().saturating_sub(days);
        Ok(bars[start..].to_vec())
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, TradeError> {
        Ok(self.close_at(symbol, self.current_tick()))
    }
}
