//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading symbol (exchange security code).
///
/// Examples: "7203", "6758", "AAPL".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// The symbol is trimmed and normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Symbol for a numeric security code as carried in the binary signal feed.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        Self(code.to_string())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_normalizes_to_uppercase() {
        let symbol = Symbol::new(" aapl ");
        assert_eq!(symbol.as_str(), "AAPL");
    }

    #[test]
    fn symbol_from_code() {
        assert_eq!(Symbol::from_code(7203), Symbol::new("7203"));
    }

    #[test]
    fn symbol_display() {
        assert_eq!(Symbol::new("6758").to_string(), "6758");
    }
}
