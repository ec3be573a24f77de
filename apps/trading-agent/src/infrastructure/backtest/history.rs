//! Daily price history files (`{data_dir}/{symbol}.csv`).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::market::PriceBar;
use crate::domain::shared::Symbol;

/// Column layout: `Date,Open,High,Low,Close,Volume`.
const COLUMNS: usize = 6;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Price history loading failure.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The file could not be opened.
    #[error("failed to open history file for {symbol} at {}: {source}", .path.display())]
    Open {
        /// Symbol being loaded.
        symbol: String,
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// A row could not be read.
    #[error("failed to read history record for {symbol}: {source}")]
    Read {
        /// Symbol being loaded.
        symbol: String,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// A row has the wrong number of columns.
    #[error("invalid record length for {symbol} at line {line}: expected 6, got {actual}")]
    ColumnCount {
        /// Symbol being loaded.
        symbol: String,
        /// 1-based line number.
        line: u64,
        /// Columns found.
        actual: usize,
    },

    /// A field could not be parsed.
    #[error("failed to parse {column} {value:?} for {symbol} at line {line}")]
    InvalidValue {
        /// Symbol being loaded.
        symbol: String,
        /// 1-based line number.
        line: u64,
        /// Column name.
        column: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Reads per-symbol history files from one directory.
#[derive(Debug, Clone)]
pub struct PriceHistoryReader {
    data_dir: PathBuf,
}

impl PriceHistoryReader {
    /// Create a reader rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the history file for `symbol`.
    #[must_use]
    pub fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv"))
    }

    /// Load every bar for `symbol`, sorted by date.
    ///
    /// # Errors
    ///
    /// Returns a [`HistoryError`] naming the symbol if the file is missing or any row
    /// is malformed.
    pub fn read(&self, symbol: &Symbol) -> Result<Vec<PriceBar>, HistoryError> {
        read_history_file(&self.path_for(symbol), symbol)
    }
}

/// Load a history CSV with a header row.
///
/// # Errors
///
/// See [`PriceHistoryReader::read`].
pub fn read_history_file(path: &Path, symbol: &Symbol) -> Result<Vec<PriceBar>, HistoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| HistoryError::Open {
            symbol: symbol.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

    let mut bars = Vec::new();
    for row in reader.records() {
        let record = row.map_err(|source| HistoryError::Read {
            symbol: symbol.to_string(),
            source,
        })?;
        let line = record.position().map_or(0, csv::Position::line);

        if record.len() != COLUMNS {
            return Err(HistoryError::ColumnCount {
                symbol: symbol.to_string(),
                line,
                actual: record.len(),
            });
        }

        let invalid = |column: &'static str, value: &str| HistoryError::InvalidValue {
            symbol: symbol.to_string(),
            line,
            column,
            value: value.to_string(),
        };
        let decimal = |index: usize, column: &'static str| {
            let raw = &record[index];
            raw.parse::<Decimal>().map_err(|_| invalid(column, raw))
        };

        let date = NaiveDate::parse_from_str(&record[0], DATE_FORMAT)
            .map_err(|_| invalid("date", &record[0]))?;
        let volume = record[5]
            .parse::<i64>()
            .map_err(|_| invalid("volume", &record[5]))?;

        bars.push(PriceBar {
            date,
            open: decimal(1, "open")?,
            high: decimal(2, "high")?,
            low: decimal(3, "low")?,
            close: decimal(4, "close")?,
            volume,
        });
    }

    bars.sort_by_key(|bar| bar.date);
    tracing::debug!(symbol = %symbol, bars = bars.len(), "Loaded price history");
    Ok(bars)
}
