//! Error types for the `civ` binary.

use civ_directory::DirectoryError;
use civ_server::ServerError;
use civ_watch::WatchError;
use civ_worker::{DirectionsError, TradeError};

use crate::config::ConfigError;

/// Top-level error for `civ` commands.
///
/// Only startup and command failures reach this type; everything the
/// worker absorbs at runtime is logged where it happens.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The directions file could not be loaded.
    #[error("directions error: {source}")]
    Directions {
        /// The underlying directions error.
        #[from]
        source: DirectionsError,
    },

    /// A directory call failed.
    #[error("directory error: {source}")]
    Directory {
        /// The underlying directory error.
        #[from]
        source: DirectoryError,
    },

    /// A call to a worker's trade facade failed.
    #[error("trade error: {source}")]
    Trade {
        /// The underlying trade error.
        #[from]
        source: TradeError,
    },

    /// The trade facade failed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },

    /// The watch view failed.
    #[error("watch error: {source}")]
    Watch {
        /// The underlying watch error.
        #[from]
        source: WatchError,
    },

    /// A listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: std::net::SocketAddr,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The directory service stopped with an I/O error.
    #[error("directory service error: {0}")]
    Service(std::io::Error),
}
