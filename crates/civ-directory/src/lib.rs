//! Directory service abstraction for the civ trading simulation.
//!
//! Workers mirror their inventories into an external directory as
//! annotations on their own record, and observers watch the directory for
//! modifications. The core only relies on five primitives, captured by the
//! [`Directory`] trait:
//!
//! - [`list_names`](Directory::list_names) -- names of records in a scope
//! - [`watch`](Directory::watch) -- stream of modification events
//! - [`patch`](Directory::patch) -- merge annotations into a record
//! - [`container_names`](Directory::container_names) -- containers of a record
//! - [`logs`](Directory::logs) -- accumulated log text of a record
//!
//! # Backends
//!
//! - [`MemoryDirectory`] keeps everything in process and fans events out
//!   over a broadcast channel. It backs the directory HTTP service and the
//!   tests.
//! - [`HttpDirectory`] talks to the directory HTTP service with `reqwest`,
//!   reading the watch stream as newline-delimited JSON.
//!
//! The [`service`] module exposes a [`MemoryDirectory`] over HTTP.

pub mod directory;
pub mod error;
pub mod http;
pub mod memory;
pub mod service;

pub use directory::{Directory, LogAppender, RecordSpec, WatchStream};
pub use error::DirectoryError;
pub use http::HttpDirectory;
pub use memory::MemoryDirectory;
