//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up order and execution IDs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
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

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Broker-assigned unique identifier for an order.");
define_id!(
    ExecutionId,
    "Unique identifier for an execution, derived from the order ID and the broker's sequence token."
);

impl ExecutionId {
    /// Derive an execution ID from an order ID and an optional broker sequence token.
    ///
    /// With a token the ID is `{order_id}-{token}`; without one it is the order ID itself,
    /// so an order reported as a single execution still deduplicates on redelivery.
    #[must_use]
    pub fn derive(order_id: &OrderId, sequence: Option<&str>) -> Self {
        match sequence {
            Some(token) => Self(format!("{order_id}-{token}")),
            None => Self(order_id.as_str().to_string()),
        }
    }
}
