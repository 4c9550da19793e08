//! Forwarding a worker's own log lines to its directory record.
//!
//! [`DirectoryLogLayer`] formats every event that passes the filter into
//! one text line and queues it on a bounded channel. When the queue is
//! full the line is dropped; logging never waits on the directory.
//! [`forward_logs`] drains the queue on a fixed period and appends each
//! batch to the record with a single call.

use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;

use civ_directory::LogAppender;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Lines buffered between two flushes.
pub const LOG_QUEUE: usize = 1024;

/// How often queued lines are appended to the record.
pub const FLUSH_PERIOD: Duration = Duration::from_secs(1);

/// Layer that copies formatted events into a queue.
#[derive(Debug, Clone)]
pub struct DirectoryLogLayer {
    tx: mpsc::Sender<String>,
}

impl DirectoryLogLayer {
    /// A layer and the receiving end of its queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl<S: Subscriber> Layer<S> for DirectoryLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = LineVisitor::default();
        event.record(&mut line);
        let meta = event.metadata();
        let _ = self.tx.try_send(format!(
            "{} {}: {}{}\n",
            meta.level(),
            meta.target(),
            line.message,
            line.fields
        ));
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

/// Append queued lines to record `name` in `scope` every `period` until
/// `cancel` fires, then flush what is left.
///
/// Failed appends are dropped; the lines are not retried.
pub async fn forward_logs(
    mut rx: mpsc::Receiver<String>,
    sink: Arc<dyn LogAppender>,
    scope: String,
    name: String,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        let stopping = tokio::select! {
            () = cancel.cancelled() => true,
            _ = ticker.tick() => false,
        };

        let mut batch = String::new();
        while let Ok(line) = rx.try_recv() {
            batch.push_str(&line);
        }
        if !batch.is_empty() {
            let _ = sink.append_logs(&scope, &name, batch).await;
        }
        if stopping {
            break;
        }
    }
}
