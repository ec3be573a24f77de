//! Persistence errors shared by every repository port.

/// Error raised by a repository adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// Backing store could not be reached.
    #[error("Repository unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Write rejected by the backing store.
    #[error("Repository write rejected: {message}")]
    WriteRejected {
        /// Error details.
        message: String,
    },
}
