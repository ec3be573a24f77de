//! Configuration validation.

use super::{Config, ConfigError};

/// Which entry point the configuration is being loaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Historical replay through the backtest simulator.
    Backtest,
    /// Recorded event stream replay.
    Replay,
}

/// Result of mode-specific startup validation.
#[derive(Debug, Default)]
pub struct StartupValidation {
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

fn require_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(format!("{name} must be in (0, 1], got {value}")));
    }
    Ok(())
}

fn require_rate(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..100.0).contains(&value) {
        return Err(invalid(format!("{name} must be in [0, 100), got {value}")));
    }
    Ok(())
}

/// Validate mode-independent configuration values.
///
/// # Errors
///
/// [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.agent.execution_interval.is_zero() {
        return Err(invalid("agent.execution_interval must be positive"));
    }
    if config.agent.sync_timeout_secs == 0 {
        return Err(invalid("agent.sync_timeout_secs must be positive"));
    }
    if config.agent.strategy != "swingtrade" {
        return Err(invalid(format!(
            "agent.strategy must be 'swingtrade', got '{}'",
            config.agent.strategy
        )));
    }

    let swing = &config.strategy_settings.swingtrade;
    require_fraction("trade_risk_percentage", swing.trade_risk_percentage)?;
    require_fraction(
        "max_position_size_percentage",
        swing.max_position_size_percentage,
    )?;
    require_rate("profit_take_rate", swing.profit_take_rate)?;
    require_rate("stop_loss_rate", swing.stop_loss_rate)?;
    require_rate("trailing_stop_trigger_rate", swing.trailing_stop_trigger_rate)?;
    require_rate("trailing_stop_rate", swing.trailing_stop_rate)?;

    if swing.unit_size <= 0 {
        return Err(invalid("unit_size must be positive"));
    }
    if swing.atr_period == 0 {
        return Err(invalid("atr_period must be positive"));
    }
    if !(swing.stop_loss_atr_multiplier > 0.0) {
        return Err(invalid("stop_loss_atr_multiplier must be positive"));
    }
    if !(swing.risk_per_atr > 0.0) {
        return Err(invalid("risk_per_atr must be positive"));
    }
    if swing.signal_file_pattern.trim().is_empty() {
        return Err(invalid("signal_file_pattern must not be empty"));
    }
    if swing.target_symbols.iter().any(|s| s.trim().is_empty()) {
        return Err(invalid("target_symbols must not contain empty entries"));
    }

    Ok(())
}

/// Validate the parts of the configuration `mode` depends on.
///
/// # Errors
///
/// [`ConfigError::ValidationError`] for settings the mode cannot run without.
pub fn validate_startup(config: &Config, mode: RunMode) -> Result<StartupValidation, ConfigError> {
    let mut result = StartupValidation::default();
    let targets = &config.strategy_settings.swingtrade.target_symbols;

    match mode {
        RunMode::Backtest => {
            if targets.is_empty() {
                return Err(invalid("backtest requires at least one target symbol"));
            }
            if !(config.backtest.initial_cash > 0.0) {
                return Err(invalid("backtest.initial_cash must be positive"));
            }
            if !config.backtest.data_dir.is_dir() {
                result.warnings.push(format!(
                    "backtest.data_dir {} does not exist",
                    config.backtest.data_dir.display()
                ));
            }
        }
        RunMode::Replay => {
            if targets.is_empty() {
                result
                    .warnings
                    .push("no target symbols: price feed rows cannot be mapped".to_string());
            }
        }
    }

    for warning in &result.warnings {
        tracing::warn!(mode = ?mode, "{warning}");
    }
    Ok(result)
}
