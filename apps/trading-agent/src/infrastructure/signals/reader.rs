//! Binary signal file decoding.
//!
//! A file is a sequence of 3-byte records, `[symbol: u16 LE][signal: u8]`, until EOF.

use std::path::Path;

use crate::application::ports::SignalError;
use crate::domain::market::{SignalAction, TradeSignal};
use crate::domain::shared::Symbol;

const RECORD_LEN: usize = 3;

/// Decode signal records from `bytes`. `path` is only used in errors.
///
/// # Errors
///
/// - [`SignalError::IncompleteRecord`] if the data ends partway through a record.
/// - [`SignalError::InvalidSignal`] for a signal byte other than 1 or 2.
pub fn decode_signals(bytes: &[u8], path: &Path) -> Result<Vec<TradeSignal>, SignalError> {
    let mut chunks = bytes.chunks_exact(RECORD_LEN);
    let mut signals = Vec::with_capacity(bytes.len() / RECORD_LEN);

    for (i, record) in chunks.by_ref().enumerate() {
        let offset = i * RECORD_LEN;
        let code = u16::from_le_bytes([record[0], record[1]]);
        let action = SignalAction::from_byte(record[2]).ok_or_else(|| SignalError::InvalidSignal {
            path: path.to_path_buf(),
            offset: offset + 2,
            value: record[2],
        })?;
        signals.push(TradeSignal::new(Symbol::from_code(code), action));
    }

    let remaining = chunks.remainder().len();
    if remaining > 0 {
        return Err(SignalError::IncompleteRecord {
            path: path.to_path_buf(),
            offset: bytes.len() - remaining,
            remaining,
        });
    }

    Ok(signals)
}

/// Read and decode a signal file. An empty file is an empty batch.
///
/// # Errors
///
/// [`SignalError::Io`] if the file cannot be read, otherwise see [`decode_signals`].
pub fn read_signal_file(path: &Path) -> Result<Vec<TradeSignal>, SignalError> {
    let bytes = std::fs::read(path).map_err(|source| SignalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_signals(&bytes, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(code: u16, signal: u8) -> Vec<u8> {
        let mut bytes = code.to_le_bytes().to_vec();
        bytes.push(signal);
        bytes
    }

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_records_in_order() {
        let bytes = [record(7203, 1), record(6758, 2)].concat();
        let file = file_with(&bytes);

        let signals = read_signal_file(file.path()).unwrap();

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].symbol.as_str(), "7203");
        assert_eq!(signals[0].action, SignalAction::Buy);
        assert_eq!(signals[1].symbol.as_str(), "6758");
        assert_eq!(signals[1].action, SignalAction::Sell);
    }

    #[test]
    fn empty_file_is_empty_batch() {
        let file = file_with(&[]);
        assert!(read_signal_file(file.path()).unwrap().is_empty());
    }

    #[test]
    fn symbol_without_signal_is_incomplete() {
        let bytes = [record(7203, 1), 6758u16.to_le_bytes().to_vec()].concat();
        let err = decode_signals(&bytes, Path::new("s.bin")).unwrap_err();
        assert!(matches!(
            err,
            SignalError::IncompleteRecord {
                offset: 3,
                remaining: 2,
                ..
            }
        ));
        assert!(err.to_string().contains("Incomplete record"));
    }

    #[test]
    fn lone_trailing_byte_is_incomplete() {
        let bytes = [record(7203, 1), vec![0x01]].concat();
        let err = decode_signals(&bytes, Path::new("s.bin")).unwrap_err();
        assert!(matches!(err, SignalError::IncompleteRecord { remaining: 1, .. }));
    }

    #[test]
    fn unknown_signal_byte_is_error() {
        let bytes = [record(7203, 1), record(6758, 3)].concat();
        let err = decode_signals(&bytes, Path::new("s.bin")).unwrap_err();
        assert!(matches!(
            err,
            SignalError::InvalidSignal {
                offset: 5,
                value: 3,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_signal_file(Path::new("/nonexistent/signals.bin")).unwrap_err();
        assert!(matches!(err, SignalError::Io { .. }));
    }
}
