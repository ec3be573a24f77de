//! Position accounting: how one execution moves one position.
//!
//! Pure functions, no I/O. The reconciler loads the current position, calls
//! [`apply_execution`], and commits the returned [`PositionChange`].

use rust_decimal::Decimal;

use super::errors::PositionError;
use super::position::{Position, PositionKey, PositionType};
use crate::domain::order_execution::{Execution, PositionAccountType, TradeType};

/// Outcome of applying an execution to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionChange {
    /// No position existed; the execution opened one.
    Opened(Position),
    /// Existing position updated, quantity still positive.
    Updated(Position),
    /// Quantity reached zero or below; the position must be deleted.
    Closed {
        /// Position as it stood after applying the execution.
        position: Position,
        /// Realized profit or loss of the closing execution.
        realized_pnl: Decimal,
    },
}

impl PositionChange {
    /// Identity of the affected position.
    #[must_use]
    pub const fn key(&self) -> &PositionKey {
        self.position().key()
    }

    /// Position after the change.
    #[must_use]
    pub const fn position(&self) -> &Position {
        match self {
            Self::Opened(p) | Self::Updated(p) | Self::Closed { position: p, .. } => p,
        }
    }

    /// True if the position must be removed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Apply `execution`, traded through an order of `account_type`, to `existing`.
///
/// - No position: only a buy on `Cash`/`MarginNew` opens one (long, highest = price).
/// - `Buy + MarginRepay` reduces a short; `Sell + MarginRepay` reduces a long.
/// - `Buy + Cash|MarginNew` averages in and marks the position long.
/// - `Sell + MarginNew` averages in and marks the position short.
/// - `Sell + Cash` reduces without touching the average.
///
/// The highest price is raised to the execution price on every execution.
///
/// # Errors
///
/// Returns a [`PositionError`] for a reduction with nothing to reduce, a repay leg
/// against the wrong direction, a non-positive quantity or price, or an execution
/// whose quantity or cost overflows the position.
pub fn apply_execution(
    existing: Option<&Position>,
    execution: &Execution,
    account_type: PositionAccountType,
) -> Result<PositionChange, PositionError> {
    validate(execution)?;

    let price = execution.price;
    let qty = execution.quantity;

    let Some(current) = existing else {
        return match (execution.trade_type, account_type) {
            (TradeType::Buy, PositionAccountType::Cash | PositionAccountType::MarginNew) => {
                let key = PositionKey::new(execution.symbol.clone(), account_type);
                Ok(PositionChange::Opened(Position::open_long(key, price, qty)))
            }
            (trade_type, account_type) => Err(PositionError::NoPositionToReduce {
                symbol: execution.symbol.to_string(),
                account_type,
                trade_type,
            }),
        };
    };

    let mut position = current.clone();
    let mut realized_pnl = Decimal::ZERO;

    match (execution.trade_type, account_type) {
        (TradeType::Buy, PositionAccountType::MarginRepay) => {
            require_direction(&position, execution, account_type, PositionType::Short)?;
            realized_pnl = pnl(position.average_price() - price, &position, execution)?;
            position.reduce(qty).ok_or_else(|| overflow(execution))?;
        }
        (TradeType::Buy, PositionAccountType::Cash | PositionAccountType::MarginNew) => {
            position
                .accumulate(price, qty, PositionType::Long)
                .ok_or_else(|| overflow(execution))?;
        }
        (TradeType::Sell, PositionAccountType::MarginRepay) => {
            require_direction(&position, execution, account_type, PositionType::Long)?;
            realized_pnl = pnl(price - position.average_price(), &position, execution)?;
            position.reduce(qty).ok_or_else(|| overflow(execution))?;
        }
        (TradeType::Sell, PositionAccountType::MarginNew) => {
            position
                .accumulate(price, qty, PositionType::Short)
                .ok_or_else(|| overflow(execution))?;
        }
        (TradeType::Sell, PositionAccountType::Cash) => {
            realized_pnl = pnl(price - position.average_price(), &position, execution)?;
            position.reduce(qty).ok_or_else(|| overflow(execution))?;
        }
    }

    position.raise_highest_price(price);

    if position.quantity() <= 0 {
        Ok(PositionChange::Closed {
            position,
            realized_pnl,
        })
    } else {
        Ok(PositionChange::Updated(position))
    }
}

fn validate(execution: &Execution) -> Result<(), PositionError> {
    if execution.quantity <= 0 {
        return Err(PositionError::InvalidExecution {
            symbol: execution.symbol.to_string(),
            message: format!("non-positive quantity {}", execution.quantity),
        });
    }
    if execution.price <= Decimal::ZERO {
        return Err(PositionError::InvalidExecution {
            symbol: execution.symbol.to_string(),
            message: format!("non-positive price {}", execution.price),
        });
    }
    Ok(())
}

fn require_direction(
    position: &Position,
    execution: &Execution,
    account_type: PositionAccountType,
    expected: PositionType,
) -> Result<(), PositionError> {
    if position.position_type() == expected {
        Ok(())
    } else {
        Err(PositionError::DirectionMismatch {
            symbol: execution.symbol.to_string(),
            trade_type: execution.trade_type,
            account_type,
            expected,
            actual: position.position_type(),
        })
    }
}

/// Realized profit of closing up to the held quantity at `per_share`.
fn pnl(
    per_share: Decimal,
    position: &Position,
    execution: &Execution,
) -> Result<Decimal, PositionError> {
    let closed = Decimal::from(execution.quantity.min(position.quantity()));
    per_share
        .checked_mul(closed)
        .ok_or_else(|| overflow(execution))
}

fn overflow(execution: &Execution) -> PositionError {
    PositionError::InvalidExecution {
        symbol: execution.symbol.to_string(),
        message: format!(
            "{} shares at {} overflows the position",
            execution.quantity, execution.price
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{ExecutionId, OrderId, Symbol};
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn exec(trade_type: TradeType, quantity: i64, price: Decimal) -> Execution {
        Execution::new(
            ExecutionId::new("O1-1"),
            OrderId::new("O1"),
            Symbol::new("7203"),
            trade_type,
            quantity,
            price,
            Utc::now(),
        )
    }

    fn long(account_type: PositionAccountType, avg: Decimal, qty: i64) -> Position {
        Position::new(
            PositionKey::new(Symbol::new("7203"), account_type),
            PositionType::Long,
            avg,
            qty,
            avg,
        )
    }

    fn short(avg: Decimal, qty: i64) -> Position {
        Position::new(
            PositionKey::new(Symbol::new("7203"), PositionAccountType::MarginNew),
            PositionType::Short,
            avg,
            qty,
            avg,
        )
    }

    #[test]
    fn buy_opens_long_position() {
        let change = apply_execution(
            None,
            &exec(TradeType::Buy, 60, dec!(1000)),
            PositionAccountType::Cash,
        )
        .unwrap();

        let PositionChange::Opened(pos) = change else {
            panic!("expected Opened, got {change:?}");
        };
        assert_eq!(pos.position_type(), PositionType::Long);
        assert_eq!(pos.average_price(), dec!(1000));
        assert_eq!(pos.quantity(), 60);
        assert_eq!(pos.highest_price(), dec!(1000));
    }

    #[test]
    fn sell_without_position_is_integrity_error() {
        for account in [
            PositionAccountType::Cash,
            PositionAccountType::MarginNew,
            PositionAccountType::MarginRepay,
        ] {
            let result = apply_execution(None, &exec(TradeType::Sell, 10, dec!(1000)), account);
            assert!(matches!(
                result,
                Err(PositionError::NoPositionToReduce { .. })
            ));
        }
    }

    #[test]
    fn repay_buy_without_position_is_integrity_error() {
        let result = apply_execution(
            None,
            &exec(TradeType::Buy, 10, dec!(1000)),
            PositionAccountType::MarginRepay,
        );
        assert!(matches!(
            result,
            Err(PositionError::NoPositionToReduce { .. })
        ));
    }

    #[test]
    fn buy_cash_averages_in() {
        let existing = long(PositionAccountType::Cash, dec!(1000), 60);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Buy, 40, dec!(1010)),
            PositionAccountType::Cash,
        )
        .unwrap();

        let pos = change.position();
        assert!(matches!(change, PositionChange::Updated(_)));
        assert_eq!(pos.average_price(), dec!(1004));
        assert_eq!(pos.quantity(), 100);
        assert_eq!(pos.highest_price(), dec!(1010));
    }

    #[test]
    fn sell_cash_decrements_without_average_change() {
        let existing = long(PositionAccountType::Cash, dec!(1000), 100);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 30, dec!(1200)),
            PositionAccountType::Cash,
        )
        .unwrap();

        assert_eq!(change.position().quantity(), 70);
        assert_eq!(change.position().average_price(), dec!(1000));
        assert_eq!(change.position().highest_price(), dec!(1200));
    }

    #[test]
    fn sell_cash_full_quantity_closes() {
        let existing = long(PositionAccountType::Cash, dec!(1000), 100);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 100, dec!(1200)),
            PositionAccountType::Cash,
        )
        .unwrap();

        let PositionChange::Closed {
            position,
            realized_pnl,
        } = change
        else {
            panic!("expected Closed");
        };
        assert_eq!(position.quantity(), 0);
        assert_eq!(realized_pnl, dec!(20000));
    }

    #[test]
    fn oversell_closes_position() {
        let existing = long(PositionAccountType::Cash, dec!(1000), 50);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 80, dec!(900)),
            PositionAccountType::Cash,
        )
        .unwrap();

        assert!(change.is_closed());
        assert_eq!(change.position().quantity(), -30);
    }

    #[test]
    fn sell_repay_reduces_long() {
        let existing = long(PositionAccountType::MarginNew, dec!(500), 200);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 100, dec!(550)),
            PositionAccountType::MarginRepay,
        )
        .unwrap();

        assert_eq!(change.position().quantity(), 100);
        assert_eq!(change.position().average_price(), dec!(500));
    }

    #[test]
    fn sell_repay_against_short_is_error() {
        let existing = short(dec!(500), 100);
        let result = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 100, dec!(450)),
            PositionAccountType::MarginRepay,
        );
        assert!(matches!(
            result,
            Err(PositionError::DirectionMismatch {
                expected: PositionType::Long,
                actual: PositionType::Short,
                ..
            })
        ));
    }

    #[test]
    fn buy_repay_reduces_short() {
        let existing = short(dec!(500), 100);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Buy, 100, dec!(450)),
            PositionAccountType::MarginRepay,
        )
        .unwrap();

        let PositionChange::Closed { realized_pnl, .. } = change else {
            panic!("expected Closed");
        };
        assert_eq!(realized_pnl, dec!(5000));
    }

    #[test]
    fn buy_repay_against_long_is_error() {
        let existing = long(PositionAccountType::MarginNew, dec!(500), 100);
        let result = apply_execution(
            Some(&existing),
            &exec(TradeType::Buy, 10, dec!(450)),
            PositionAccountType::MarginRepay,
        );
        assert!(matches!(
            result,
            Err(PositionError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn sell_margin_new_builds_short() {
        let existing = short(dec!(500), 100);
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 100, dec!(520)),
            PositionAccountType::MarginNew,
        )
        .unwrap();

        let pos = change.position();
        assert_eq!(pos.position_type(), PositionType::Short);
        assert_eq!(pos.average_price(), dec!(510));
        assert_eq!(pos.quantity(), 200);
        assert_eq!(pos.highest_price(), dec!(520));
    }

    #[test]
    fn highest_price_never_decreases() {
        let existing = Position::new(
            PositionKey::cash(Symbol::new("7203")),
            PositionType::Long,
            dec!(1000),
            100,
            dec!(1300),
        );
        let change = apply_execution(
            Some(&existing),
            &exec(TradeType::Buy, 10, dec!(1100)),
            PositionAccountType::Cash,
        )
        .unwrap();
        assert_eq!(change.position().highest_price(), dec!(1300));
    }

    #[test]
    fn zero_quantity_execution_rejected() {
        let result = apply_execution(
            None,
            &exec(TradeType::Buy, 0, dec!(1000)),
            PositionAccountType::Cash,
        );
        assert!(matches!(
            result,
            Err(PositionError::InvalidExecution { .. })
        ));
    }

    #[test]
    fn overflowing_buy_is_invalid_execution() {
        let existing = long(PositionAccountType::Cash, dec!(1000), 60);
        let result = apply_execution(
            Some(&existing),
            &exec(TradeType::Buy, i64::MAX, dec!(1000)),
            PositionAccountType::Cash,
        );
        assert!(matches!(
            result,
            Err(PositionError::InvalidExecution { .. })
        ));
    }

    #[test]
    fn overflowing_realized_pnl_is_invalid_execution() {
        let existing = long(PositionAccountType::Cash, dec!(1), 100);
        let result = apply_execution(
            Some(&existing),
            &exec(TradeType::Sell, 100, Decimal::MAX),
            PositionAccountType::Cash,
        );
        assert!(matches!(
            result,
            Err(PositionError::InvalidExecution { .. })
        ));
    }

    proptest! {
        #[test]
        fn weighted_average_law(
            old_qty in 1i64..100_000,
            old_avg in 1i64..1_000_000,
            qty in 1i64..100_000,
            price in 1i64..1_000_000,
        ) {
            let old_avg = Decimal::from(old_avg);
            let price = Decimal::from(price);
            let existing = long(PositionAccountType::Cash, old_avg, old_qty);
            let change = apply_execution(
                Some(&existing),
                &exec(TradeType::Buy, qty, price),
                PositionAccountType::Cash,
            )
            .unwrap();

            let expected = (old_avg * Decimal::from(old_qty) + price * Decimal::from(qty))
                / Decimal::from(old_qty + qty);
            prop_assert_eq!(change.position().average_price(), expected);
            prop_assert_eq!(change.position().quantity(), old_qty + qty);
        }

        #[test]
        fn deletion_law(held in 1i64..10_000, extra in 0i64..10_000) {
            let existing = long(PositionAccountType::Cash, dec!(1000), held);
            let change = apply_execution(
                Some(&existing),
                &exec(TradeType::Sell, held + extra, dec!(1000)),
                PositionAccountType::Cash,
            )
            .unwrap();
            prop_assert!(change.is_closed());
        }
    }
}
