//! Error types for the civ-worker crate.
//!
//! Only configuration errors are fatal. Trade failures are typed here so
//! the trade client can log them precisely before absorbing them into a
//! [`PurchaseOutcome`](crate::PurchaseOutcome).

use std::path::PathBuf;

/// Errors loading the directions file. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum DirectionsError {
    /// The file could not be read.
    #[error("failed to read directions file {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file was not a valid list of directions.
    #[error("failed to parse directions: {0}")]
    Json(#[from] serde_json::Error),

    /// A direction parsed but is unusable.
    #[error("direction {index} is invalid: {reason}")]
    Invalid {
        /// Position of the direction in the file.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
}

/// Errors talking to a peer worker.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    /// The request could not be sent or the response not read.
    #[error("trade transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The peer answered with a status the caller did not expect.
    #[error("peer returned {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}
