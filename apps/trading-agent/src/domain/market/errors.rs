//! Indicator errors.

/// An indicator could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndicatorError {
    /// Not enough bars for the requested period.
    #[error("Insufficient price history: need {required} bars, have {available}")]
    InsufficientBars {
        /// Bars required.
        required: usize,
        /// Bars supplied.
        available: usize,
    },

    /// Period must be at least one.
    #[error("Invalid indicator period: {period}")]
    InvalidPeriod {
        /// Requested period.
        period: usize,
    },
}
