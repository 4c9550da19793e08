//! Trade facade for a civ worker.
//!
//! Every worker process serves a small HTTP API next to its production
//! loop. Peers buy through it and orchestration health checks use it to
//! decide whether the worker is alive and stocked.
//!
//! | Method | Path | Responses |
//! |--------|------|-----------|
//! | `GET` | `/live` | `200` while the process serves |
//! | `GET` | `/ready` | `200` when every minimum is met, else `503` |
//! | `POST` | `/sell` | `200` sold, `409` insufficient, `400` malformed |
//! | `GET` | `/inventory` | `200` with the product map, `500` on encode failure |
//!
//! Handlers never hold the inventory lock across an await; they only call
//! the worker's atomic operations.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::TradeApiError;
pub use router::build_router;
pub use server::{DEFAULT_SHUTDOWN_GRACE, ServerError, run_server};
pub use state::AppState;
