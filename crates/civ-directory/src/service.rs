//! Directory HTTP service.
//!
//! Exposes a [`MemoryDirectory`] over HTTP so that worker processes and
//! observers in other processes share one directory.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/scopes` | Scope names |
//! | `GET` | `/scopes/{scope}/labels/{key}` | Distinct values of one label |
//! | `GET` | `/scopes/{scope}/records?label=k=v` | Record names |
//! | `PUT` | `/scopes/{scope}/records/{name}` | Register labels and containers |
//! | `PATCH` | `/scopes/{scope}/records/{name}/annotations` | Merge annotations |
//! | `GET` | `/scopes/{scope}/records/{name}/containers` | Container names |
//! | `GET` | `/scopes/{scope}/records/{name}/logs` | Log text |
//! | `POST` | `/scopes/{scope}/records/{name}/logs` | Append log text |
//! | `GET` | `/scopes/{scope}/watch?label=k=v` | NDJSON modification stream |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, put};
use axum::{Json, Router};
use civ_types::LabelSelector;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::directory::{Directory, RecordSpec};
use crate::error::DirectoryError;
use crate::memory::MemoryDirectory;

/// Shared state for the directory service.
#[derive(Debug, Clone)]
pub struct ServiceState {
    /// The backing directory.
    pub directory: Arc<MemoryDirectory>,
    /// Cancelled when the service shuts down; open watch streams end with it.
    pub shutdown: CancellationToken,
}

/// Errors surfaced to directory service clients.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A directory operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// An invalid query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Directory(DirectoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

/// Query parameters accepted by the list and watch endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct LabelQuery {
    /// Optional `key=value` label selector.
    pub label: Option<String>,
}

impl LabelQuery {
    fn selector(&self) -> Result<Option<LabelSelector>, ServiceError> {
        self.label
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e: civ_types::LabelSelectorError| ServiceError::InvalidQuery(e.to_string()))
    }
}

/// Build the router for the directory service.
pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/scopes", get(list_scopes))
        .route("/scopes/{scope}/labels/{key}", get(list_label_values))
        .route("/scopes/{scope}/records", get(list_records))
        .route("/scopes/{scope}/records/{name}", put(register_record))
        .route(
            "/scopes/{scope}/records/{name}/annotations",
            patch(patch_annotations),
        )
        .route("/scopes/{scope}/records/{name}/containers", get(get_containers))
        .route(
            "/scopes/{scope}/records/{name}/logs",
            get(get_logs).post(append_logs),
        )
        .route("/scopes/{scope}/watch", get(watch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the directory on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    directory: Arc<MemoryDirectory>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    let router = build_router(ServiceState {
        directory,
        shutdown: shutdown.clone(),
    });
    info!(%addr, "directory service listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    info!("directory service stopped");
    Ok(())
}

async fn list_scopes(State(state): State<ServiceState>) -> Json<Vec<String>> {
    Json(state.directory.scopes())
}

async fn list_label_values(
    State(state): State<ServiceState>,
    Path((scope, key)): Path<(String, String)>,
) -> Json<Vec<String>> {
    Json(state.directory.label_values(&scope, &key))
}

async fn list_records(
    State(state): State<ServiceState>,
    Path(scope): Path<String>,
    Query(query): Query<LabelQuery>,
) -> Result<Json<Vec<String>>, ServiceError> {
    let selector = query.selector()?;
    let names = state.directory.list_names(&scope, selector.as_ref()).await?;
    Ok(Json(names))
}

async fn register_record(
    State(state): State<ServiceState>,
    Path((scope, name)): Path<(String, String)>,
    Json(spec): Json<RecordSpec>,
) -> StatusCode {
    state.directory.register(&scope, &name, spec);
    StatusCode::NO_CONTENT
}

async fn patch_annotations(
    State(state): State<ServiceState>,
    Path((scope, name)): Path<(String, String)>,
    Json(annotations): Json<BTreeMap<String, String>>,
) -> Result<StatusCode, ServiceError> {
    state.directory.patch(&scope, &name, annotations).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_containers(
    State(state): State<ServiceState>,
    Path((scope, name)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ServiceError> {
    Ok(Json(state.directory.container_names(&scope, &name).await?))
}

async fn get_logs(
    State(state): State<ServiceState>,
    Path((scope, name)): Path<(String, String)>,
) -> Result<String, ServiceError> {
    Ok(state.directory.logs(&scope, &name).await?)
}

async fn append_logs(
    State(state): State<ServiceState>,
    Path((scope, name)): Path<(String, String)>,
    text: String,
) -> Result<StatusCode, ServiceError> {
    state.directory.append_logs(&scope, &name, &text)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn watch(
    State(state): State<ServiceState>,
    Path(scope): Path<String>,
    Query(query): Query<LabelQuery>,
) -> Result<Response, ServiceError> {
    let selector = query.selector()?;
    let events = state.directory.watch(&scope, selector).await?;
    let lines = events
        .take_until(state.shutdown.cancelled_owned())
        .map(|snapshot| {
            serde_json::to_vec(&snapshot).map(|mut line| {
                line.push(b'\n');
                Bytes::from(line)
            })
        });
    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
