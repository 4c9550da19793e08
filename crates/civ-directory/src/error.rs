//! Error types for directory access.

/// Errors returned by [`Directory`](crate::Directory) backends.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The named record does not exist in the scope.
    #[error("record {scope}/{name} not found")]
    NotFound {
        /// Scope (kingdom) that was searched.
        scope: String,
        /// Record name that was requested.
        name: String,
    },

    /// The directory service could not be reached.
    #[error("directory transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The directory service answered with an unexpected status.
    #[error("directory returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("directory payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}
