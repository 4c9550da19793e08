//! Request handlers for the trade facade.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use civ_types::TradeRequest;
use tracing::debug;

use crate::error::TradeApiError;
use crate::state::AppState;

/// `GET /live`
pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// `GET /ready`
pub async fn ready(State(state): State<AppState>) -> StatusCode {
    if state.worker.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// `POST /sell`
///
/// The body is decoded by hand so every decoding failure, including a
/// missing content type, answers `400`.
pub async fn sell(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, TradeApiError> {
    let request: TradeRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting malformed sell request");
        TradeApiError::Malformed(e.to_string())
    })?;

    if state.worker.sell(&request.item, request.quantity) {
        Ok(StatusCode::OK)
    } else {
        Err(TradeApiError::Insufficient { item: request.item })
    }
}

/// `GET /inventory`
pub async fn inventory(State(state): State<AppState>) -> Result<Response, TradeApiError> {
    let body = serde_json::to_vec(&state.worker.snapshot())?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
