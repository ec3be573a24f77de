//! Strategy settings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::application::services::StrategyParams;
use crate::domain::shared::Symbol;

/// Settings per strategy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Swing trading strategy.
    #[serde(default)]
    pub swingtrade: SwingtradeConfig,
}

/// Swing trading strategy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingtradeConfig {
    /// Symbols the strategy trades, in price feed row order.
    #[serde(default)]
    pub target_symbols: Vec<String>,
    /// Fraction of buying power risked per trade.
    #[serde(default = "default_trade_risk_percentage")]
    pub trade_risk_percentage: f64,
    /// Largest position as a fraction of buying power.
    #[serde(default = "default_max_position_size_percentage")]
    pub max_position_size_percentage: f64,
    /// Trading lot.
    #[serde(default = "default_unit_size")]
    pub unit_size: i64,
    /// Profit-take distance, percent.
    #[serde(default = "default_profit_take_rate")]
    pub profit_take_rate: f64,
    /// Fixed stop distance, percent. Zero disables the rule.
    #[serde(default)]
    pub stop_loss_rate: f64,
    /// Gain that arms the trailing stop, percent.
    #[serde(default = "default_trailing_stop_trigger_rate")]
    pub trailing_stop_trigger_rate: f64,
    /// Trailing stop distance, percent.
    #[serde(default = "default_trailing_stop_rate")]
    pub trailing_stop_rate: f64,
    /// Glob for the signal file.
    #[serde(default = "default_signal_file_pattern")]
    pub signal_file_pattern: String,
    /// ATR lookback in bars.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Risk measured in ATR units. Accepted but not used by sizing.
    #[serde(default = "default_risk_per_atr")]
    pub risk_per_atr: f64,
    /// ATR multiple for the stop distance.
    #[serde(default = "default_stop_loss_atr_multiplier")]
    pub stop_loss_atr_multiplier: f64,
}

impl Default for SwingtradeConfig {
    fn default() -> Self {
        Self {
            target_symbols: Vec::new(),
            trade_risk_percentage: default_trade_risk_percentage(),
            max_position_size_percentage: default_max_position_size_percentage(),
            unit_size: default_unit_size(),
            profit_take_rate: default_profit_take_rate(),
            stop_loss_rate: 0.0,
            trailing_stop_trigger_rate: default_trailing_stop_trigger_rate(),
            trailing_stop_rate: default_trailing_stop_rate(),
            signal_file_pattern: default_signal_file_pattern(),
            atr_period: default_atr_period(),
            risk_per_atr: default_risk_per_atr(),
            stop_loss_atr_multiplier: default_stop_loss_atr_multiplier(),
        }
    }
}

impl SwingtradeConfig {
    /// Target symbols as domain values.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.target_symbols.iter().map(Symbol::new).collect()
    }

    /// Convert to decision engine parameters.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] if a rate cannot be represented as a decimal.
    pub fn to_strategy_params(&self) -> Result<StrategyParams, ConfigError> {
        Ok(StrategyParams {
            target_symbols: self.symbols(),
            trade_risk_percentage: decimal("trade_risk_percentage", self.trade_risk_percentage)?,
            max_position_size_percentage: decimal(
                "max_position_size_percentage",
                self.max_position_size_percentage,
            )?,
            unit_size: self.unit_size,
            profit_take_rate: decimal("profit_take_rate", self.profit_take_rate)?,
            stop_loss_rate: decimal("stop_loss_rate", self.stop_loss_rate)?,
            trailing_stop_trigger_rate: decimal(
                "trailing_stop_trigger_rate",
                self.trailing_stop_trigger_rate,
            )?,
            trailing_stop_rate: decimal("trailing_stop_rate", self.trailing_stop_rate)?,
            atr_period: self.atr_period,
            stop_loss_atr_multiplier: decimal(
                "stop_loss_atr_multiplier",
                self.stop_loss_atr_multiplier,
            )?,
        })
    }
}

fn decimal(field: &str, value: f64) -> Result<Decimal, ConfigError> {
    Decimal::try_from(value)
        .map(|d| d.normalize())
        .map_err(|e| ConfigError::ValidationError(format!("{field}: {e}")))
}

const fn default_trade_risk_percentage() -> f64 {
    0.02
}

const fn default_max_position_size_percentage() -> f64 {
    0.25
}

const fn default_unit_size() -> i64 {
    100
}

const fn default_profit_take_rate() -> f64 {
    10.0
}

const fn default_trailing_stop_trigger_rate() -> f64 {
    5.0
}

const fn default_trailing_stop_rate() -> f64 {
    3.0
}

fn default_signal_file_pattern() -> String {
    "./signals/*.bin".to_string()
}

const fn default_atr_period() -> usize {
    14
}

const fn default_risk_per_atr() -> f64 {
    0.5
}

const fn default_stop_loss_atr_multiplier() -> f64 {
    2.0
}
