//! Signal Source Port (Driven Port)
//!
//! Where the decision loop gets its strategy signals from.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::market::TradeSignal;

/// Signal reading error.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The file could not be read.
    #[error("Failed to read signal file {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file ends partway through a record.
    #[error("Incomplete record at byte {offset} in {}: {remaining} trailing byte(s)", .path.display())]
    IncompleteRecord {
        /// File path.
        path: PathBuf,
        /// Offset of the partial record.
        offset: usize,
        /// Bytes left over.
        remaining: usize,
    },

    /// A signal byte other than 1 or 2.
    #[error("Invalid signal byte {value:#04x} at byte {offset} in {}", .path.display())]
    InvalidSignal {
        /// File path.
        path: PathBuf,
        /// Offset of the signal byte.
        offset: usize,
        /// The byte found.
        value: u8,
    },

    /// The background load task did not complete.
    #[error("Signal loading task failed: {0}")]
    Task(String),

    /// The file name pattern is unusable.
    #[error("Invalid signal file pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern.
        pattern: String,
        /// Details.
        message: String,
    },
}

/// Port for loading the current signal batch.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The latest available signals. No signal file is an empty batch.
    async fn latest_signals(&self) -> Result<Vec<TradeSignal>, SignalError>;
}
