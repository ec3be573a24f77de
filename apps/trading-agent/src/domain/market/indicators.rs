//! Technical indicators.

use rust_decimal::Decimal;

use super::errors::IndicatorError;
use super::price_bar::PriceBar;

/// Wilder's average true range over `period`, computed from bars ordered oldest first.
///
/// Needs `period + 1` bars: the first bar only supplies a previous close. The seed is
/// the mean of the first `period` true ranges; every later range is smoothed in as
/// `atr = (atr * (period - 1) + tr) / period`.
///
/// # Errors
///
/// Returns [`IndicatorError::InvalidPeriod`] for a zero period and
/// [`IndicatorError::InsufficientBars`] when fewer than `period + 1` bars are given.
pub fn average_true_range(bars: &[PriceBar], period: usize) -> Result<Decimal, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { period });
    }
    if bars.len() < period + 1 {
        return Err(IndicatorError::InsufficientBars {
            required: period + 1,
            available: bars.len(),
        });
    }

    let true_ranges: Vec<Decimal> = bars
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    let n = Decimal::from(period as u64);
    let seed: Decimal = true_ranges[..period].iter().copied().sum::<Decimal>() / n;

    Ok(true_ranges[period..]
        .iter()
        .fold(seed, |atr, tr| (atr * (n - Decimal::ONE) + *tr) / n))
}
