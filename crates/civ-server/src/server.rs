//! Trade facade lifecycle.
//!
//! [`run_server`] serves until the shared [`CancellationToken`] fires,
//! then lets in-flight requests drain for at most the grace period
//! before aborting the server task.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Default time in-flight requests get to finish after shutdown starts.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Serve the facade on `listener` until `cancel` fires.
///
/// # Errors
///
/// Returns an error if the listener address cannot be read or the server
/// fails while serving.
pub async fn run_server(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
    grace: Duration,
) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;
    let router = build_router(state);

    info!(%addr, "trade facade listening");

    let mut handle = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(cancel.clone().cancelled_owned())
            .into_future(),
    );

    tokio::select! {
        joined = &mut handle => return finish(joined),
        () = cancel.cancelled() => {}
    }

    match tokio::time::timeout(grace, &mut handle).await {
        Ok(joined) => finish(joined),
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "trade facade did not drain in time, aborting");
            handle.abort();
            Ok(())
        }
    }
}

fn finish(joined: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), ServerError> {
    match joined {
        Ok(Ok(())) => {
            info!("trade facade stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(ServerError::Serve(format!("serve error: {e}"))),
        Err(e) => Err(ServerError::Serve(format!("server task failed: {e}"))),
    }
}

/// Errors that can occur when starting or running the facade.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
