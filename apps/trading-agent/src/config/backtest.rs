//! Backtest settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Directory holding `{symbol}.csv` history files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Starting cash, also the starting buying power.
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            initial_cash: default_initial_cash(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/history")
}

const fn default_initial_cash() -> f64 {
    10_000_000.0
}
