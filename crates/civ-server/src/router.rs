//! Axum router construction for the trade facade.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the facade router.
///
/// - `GET /live` -- liveness check
/// - `GET /ready` -- readiness check
/// - `POST /sell` -- hand inventory to a buyer
/// - `GET /inventory` -- current inventory
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/live", get(handlers::live))
        .route("/ready", get(handlers::ready))
        .route("/sell", post(handlers::sell))
        .route("/inventory", get(handlers::inventory))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
