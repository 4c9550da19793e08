//! Best-effort propagation of inventory snapshots to the directory.
//!
//! [`StateMirror::publish`] never blocks and never fails: it replaces the
//! pending snapshot in a [`watch`] channel and returns. A background task
//! owned by the mirror wakes on each change and patches the worker's own
//! directory record with the newest snapshot. Bursts of mutations collapse
//! into one patch carrying the latest state, and patches are applied in
//! order. A failed patch is logged and dropped; the next mutation tries
//! again with fresh state.

use std::collections::BTreeMap;
use std::sync::Arc;

use civ_directory::Directory;
use civ_types::StateSnapshot;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle used by the worker to publish snapshots.
#[derive(Debug, Clone)]
pub struct StateMirror {
    name: Arc<str>,
    tx: Arc<watch::Sender<Option<StateSnapshot>>>,
}

impl StateMirror {
    /// Start a mirror task that patches record `name` in `scope`.
    ///
    /// The task runs until `cancel` fires or every handle is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        directory: Arc<dyn Directory>,
        scope: impl Into<String>,
        name: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        let name: String = name.into();
        let (tx, rx) = watch::channel(None);
        let mirror = Self {
            name: Arc::from(name.as_str()),
            tx: Arc::new(tx),
        };
        tokio::spawn(run_mirror(directory, scope.into(), name, rx, cancel));
        mirror
    }

    /// A mirror that discards every snapshot.
    pub fn detached() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            name: Arc::from(""),
            tx: Arc::new(tx),
        }
    }

    /// Queue `quantities` for mirroring, replacing any snapshot not yet sent.
    pub fn publish(&self, quantities: &BTreeMap<String, u32>) {
        self.tx.send_replace(Some(StateSnapshot::from_quantities(
            &*self.name,
            quantities,
        )));
    }
}

async fn run_mirror(
    directory: Arc<dyn Directory>,
    scope: String,
    name: String,
    mut rx: watch::Receiver<Option<StateSnapshot>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let pending = rx.borrow_and_update().clone();
        let Some(snapshot) = pending else {
            continue;
        };
        if let Err(e) = directory.patch(&scope, &name, snapshot.annotations).await {
            warn!(
                scope = %scope,
                name = %name,
                error = %e,
                "failed to mirror inventory to directory"
            );
        }
    }
    debug!(scope = %scope, name = %name, "state mirror stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use civ_directory::MemoryDirectory;
    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn publishes_snapshot_to_own_record() {
        let directory = Arc::new(MemoryDirectory::new());
        let mut events = directory.watch("north", None).await.unwrap();
        let cancel = CancellationToken::new();
        let mirror = StateMirror::spawn(directory.clone(), "north", "mill-0", cancel.clone());

        let mut quantities = BTreeMap::new();
        quantities.insert(String::from("flour"), 6);
        mirror.publish(&quantities);

        let event = timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.name, "mill-0");
        assert_eq!(event.annotations.get("flour").map(String::as_str), Some("6"));
        assert_eq!(event.quantities().get("flour"), Some(&6));

        cancel.cancel();
    }

    #[tokio::test]
    async fn detached_mirror_accepts_snapshots() {
        let mirror = StateMirror::detached();
        mirror.publish(&BTreeMap::new());
    }
}
