//! Backtesting Infrastructure
//!
//! - [`PriceHistoryReader`]: per-symbol daily OHLC CSV files
//! - [`BacktestTradeService`]: the trade contract filled at the close of a simulated
//!   trading day

mod history;
mod simulator;

pub use history::{HistoryError, PriceHistoryReader, read_history_file};
pub use simulator::BacktestTradeService;
