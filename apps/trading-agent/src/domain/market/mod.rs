//! Market Data
//!
//! Daily OHLC bars, the indicators computed from them, and strategy signals.

pub mod errors;
pub mod indicators;
pub mod price_bar;
pub mod signal;

pub use errors::IndicatorError;
pub use indicators::average_true_range;
pub use price_bar::PriceBar;
pub use signal::{SignalAction, TradeSignal};
