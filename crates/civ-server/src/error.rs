//! Error types for the trade facade.
//!
//! [`TradeApiError`] covers the failures a handler can report. Each
//! variant maps to one status code in its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by trade facade handlers.
#[derive(Debug, thiserror::Error)]
pub enum TradeApiError {
    /// The request body was not a valid trade request.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The seller does not hold enough of the item.
    #[error("insufficient inventory of {item}")]
    Insufficient {
        /// The requested item.
        item: String,
    },

    /// The inventory could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TradeApiError {
    /// The status code this error is reported with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Insufficient { .. } => StatusCode::CONFLICT,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TradeApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
