//! The consumer and renderer tasks and their wiring.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use civ_directory::{Directory, DirectoryError, WatchStream};
use civ_types::LabelSelector;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diff::DiffState;
use crate::render::render_frame;

/// Timing of the watch view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Redraw period.
    pub tick: Duration,
    /// How long a change stays highlighted.
    pub fade_window: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            fade_window: Duration::from_secs(5),
        }
    }
}

/// Errors that end a watch session early.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watch stream could not be opened.
    #[error("failed to open watch stream: {0}")]
    Directory(#[from] DirectoryError),

    /// The frame could not be written.
    #[error("failed to write frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Fold every snapshot from `events` into `state` until the stream ends
/// or `cancel` fires.
pub async fn run_consumer(
    mut events: WatchStream,
    state: Arc<RwLock<DiffState>>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = events.next() => next,
        };
        let Some(snapshot) = next else {
            debug!("watch stream ended");
            break;
        };
        state.write().await.record(&snapshot, Instant::now());
    }
}

/// Redraw `state` into `out` every `config.tick` until `cancel` fires.
pub async fn run_renderer<W: Write + Send>(
    state: Arc<RwLock<DiffState>>,
    config: WatchConfig,
    cancel: CancellationToken,
    mut out: W,
) -> Result<(), WatchError> {
    let mut ticker = tokio::time::interval(config.tick);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let frame = render_frame(&*state.read().await, Instant::now(), config.fade_window);
        out.write_all(frame.as_bytes())?;
        out.flush()?;
    }
    Ok(())
}

/// Watch `scope` and render into `out` until `cancel` fires.
///
/// The consumer runs as its own task. When the stream ends before
/// cancellation the last frame keeps being redrawn so fades still finish.
pub async fn watch<W: Write + Send>(
    directory: &dyn Directory,
    scope: &str,
    selector: Option<LabelSelector>,
    config: WatchConfig,
    cancel: CancellationToken,
    out: W,
) -> Result<(), WatchError> {
    let events = directory.watch(scope, selector.clone()).await?;
    info!(scope, selector = ?selector, "watching inventories");

    let state = Arc::new(RwLock::new(DiffState::new()));
    let consumer = tokio::spawn(run_consumer(events, state.clone(), cancel.clone()));

    let rendered = run_renderer(state, config, cancel.clone(), out).await;
    cancel.cancel();
    if let Err(e) = consumer.await {
        warn!(error = %e, "watch consumer task failed");
    }
    rendered
}
