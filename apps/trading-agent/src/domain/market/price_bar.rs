//! Daily OHLC bar.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trading day of price data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: Decimal,
    /// Session high.
    pub high: Decimal,
    /// Session low.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Shares traded.
    pub volume: i64,
}

impl PriceBar {
    /// True range against the previous close.
    #[must_use]
    pub fn true_range(&self, previous_close: Decimal) -> Decimal {
        let range = self.high - self.low;
        let gap_up = (self.high - previous_close).abs();
        let gap_down = (self.low - previous_close).abs();
        range.max(gap_up).max(gap_down)
    }
}
