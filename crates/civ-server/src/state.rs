//! Shared state for the trade facade.

use std::sync::Arc;

use civ_worker::Worker;

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The worker whose inventory the facade exposes.
    pub worker: Arc<Worker>,
}

impl AppState {
    /// Wrap a worker for serving.
    pub const fn new(worker: Arc<Worker>) -> Self {
        Self { worker }
    }
}
