//! Wire codec for the brokerage event stream.
//!
//! A message is a sequence of records separated by `0x01`; each record is a key and a
//! value separated by `0x02`:
//!
//! ```text
//! p_cmd 0x02 EC 0x01 p_ON 0x02 31000001 0x01 ...
//! ```

use std::collections::HashMap;

/// Record separator (`^A`).
pub const RECORD_SEPARATOR: u8 = 0x01;

/// Key/value separator (`^B`).
pub const KEY_VALUE_SEPARATOR: u8 = 0x02;

/// Parsed message fields.
pub type Fields = HashMap<String, String>;

/// Wire decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A non-blank message produced no key/value pairs.
    #[error("message parsing resulted in no key-value pairs: {raw:?}")]
    NoFields {
        /// Raw message, lossily decoded.
        raw: String,
    },
}

/// Parse one wire message into its fields.
///
/// - Empty or whitespace-only input parses to an empty map.
/// - Empty records are skipped.
/// - A record without `0x02` is kept as `key -> ""`.
/// - The last occurrence of a duplicate key wins.
///
/// # Errors
///
/// Returns [`ProtocolError::NoFields`] if a non-blank message yields no entries.
pub fn parse(raw: &[u8]) -> Result<Fields, ProtocolError> {
    let mut fields = Fields::new();

    if raw.trim_ascii().is_empty() {
        return Ok(fields);
    }

    for record in raw.split(|b| *b == RECORD_SEPARATOR) {
        if record.is_empty() {
            continue;
        }

        match record.iter().position(|b| *b == KEY_VALUE_SEPARATOR) {
            Some(at) => {
                let key = String::from_utf8_lossy(&record[..at]).into_owned();
                let value = String::from_utf8_lossy(&record[at + 1..]).into_owned();
                fields.insert(key, value);
            }
            None => {
                fields.insert(String::from_utf8_lossy(record).into_owned(), String::new());
            }
        }
    }

    if fields.is_empty() {
        return Err(ProtocolError::NoFields {
            raw: String::from_utf8_lossy(raw).into_owned(),
        });
    }

    Ok(fields)
}

/// Encode fields as one wire message.
///
/// Keys are written in sorted order so the output is stable. Keys and values must not
/// contain either separator byte.
#[must_use]
pub fn serialize(fields: &Fields) -> Vec<u8> {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    let mut out = Vec::new();
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(RECORD_SEPARATOR);
        }
        out.extend_from_slice(key.as_bytes());
        out.push(KEY_VALUE_SEPARATOR);
        out.extend_from_slice(fields[key].as_bytes());
    }
    out
}

/// Build a wire message from `(key, value)` pairs in the given order.
#[must_use]
pub fn encode_pairs(pairs: &[(&str, &str)]) -> Vec<u8> {
    pairs
        .iter()
        .map(|(k, v)| {
            let mut record = Vec::with_capacity(k.len() + v.len() + 1);
            record.extend_from_slice(k.as_bytes());
            record.push(KEY_VALUE_SEPARATOR);
            record.extend_from_slice(v.as_bytes());
            record
        })
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR)
}
