//! In-process directory backend.
//!
//! Records live in a two-level map (`scope -> name -> record`) behind a
//! [`parking_lot::RwLock`]. Every [`patch`](Directory::patch) publishes the
//! record's full annotation map on a [`broadcast`] channel; each watcher
//! filters that channel by scope and label selector. A watcher that falls
//! more than [`BROADCAST_CAPACITY`] events behind skips ahead to the newest
//! events.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use civ_types::{LabelSelector, StateSnapshot};
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::directory::{Directory, LogAppender, RecordSpec, WatchStream};
use crate::error::DirectoryError;

/// Capacity of the modification broadcast channel.
const BROADCAST_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default)]
struct Record {
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    containers: Vec<String>,
    logs: String,
}

/// A modification event before scope and label filtering.
#[derive(Debug, Clone)]
struct Modification {
    scope: String,
    labels: BTreeMap<String, String>,
    snapshot: StateSnapshot,
}

/// Directory backend holding all records in memory.
#[derive(Debug)]
pub struct MemoryDirectory {
    scopes: RwLock<BTreeMap<String, BTreeMap<String, Record>>>,
    tx: broadcast::Sender<Modification>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            scopes: RwLock::new(BTreeMap::new()),
            tx,
        }
    }

    /// Create or update the record `name`, replacing its labels and
    /// containers. Existing annotations and logs are kept. Does not emit a
    /// modification event.
    pub fn register(&self, scope: &str, name: &str, spec: RecordSpec) {
        let mut scopes = self.scopes.write();
        let record = scopes
            .entry(scope.to_owned())
            .or_default()
            .entry(name.to_owned())
            .or_default();
        record.labels = spec.labels;
        record.containers = spec.containers;
    }

    /// Append `text` to the logs of the record `name`.
    pub fn append_logs(&self, scope: &str, name: &str, text: &str) -> Result<(), DirectoryError> {
        let mut scopes = self.scopes.write();
        let record = scopes
            .get_mut(scope)
            .and_then(|records| records.get_mut(name))
            .ok_or_else(|| not_found(scope, name))?;
        record.logs.push_str(text);
        Ok(())
    }

    /// Current annotations of the record `name`, if it exists.
    pub fn annotations(&self, scope: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.scopes
            .read()
            .get(scope)
            .and_then(|records| records.get(name))
            .map(|record| record.annotations.clone())
    }

    /// Names of every scope holding at least one record, sorted.
    pub fn scopes(&self) -> Vec<String> {
        self.scopes
            .read()
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(scope, _)| scope.clone())
            .collect()
    }

    /// Distinct values of label `key` across the records in `scope`,
    /// sorted. Records without the label are skipped.
    pub fn label_values(&self, scope: &str, key: &str) -> Vec<String> {
        let scopes = self.scopes.read();
        let Some(records) = scopes.get(scope) else {
            return Vec::new();
        };
        records
            .values()
            .filter_map(|record| record.labels.get(key).cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn with_record<T>(
        &self,
        scope: &str,
        name: &str,
        f: impl FnOnce(&Record) -> T,
    ) -> Result<T, DirectoryError> {
        self.scopes
            .read()
            .get(scope)
            .and_then(|records| records.get(name))
            .map(f)
            .ok_or_else(|| not_found(scope, name))
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(scope: &str, name: &str) -> DirectoryError {
    DirectoryError::NotFound {
        scope: scope.to_owned(),
        name: name.to_owned(),
    }
}

#[async_trait]
impl LogAppender for MemoryDirectory {
    async fn append_logs(
        &self,
        scope: &str,
        name: &str,
        text: String,
    ) -> Result<(), DirectoryError> {
        Self::append_logs(self, scope, name, &text)
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_names(
        &self,
        scope: &str,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<String>, DirectoryError> {
        let scopes = self.scopes.read();
        let names = scopes
            .get(scope)
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, record)| selector.is_none_or(|s| s.matches(&record.labels)))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    async fn watch(
        &self,
        scope: &str,
        selector: Option<LabelSelector>,
    ) -> Result<WatchStream, DirectoryError> {
        let rx = self.tx.subscribe();
        let scope = scope.to_owned();

        let stream = futures::stream::unfold(rx, move |mut rx| {
            let scope = scope.clone();
            let selector = selector.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            if event.scope == scope
                                && selector.as_ref().is_none_or(|s| s.matches(&event.labels))
                            {
                                return Some((event.snapshot, rx));
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "directory watcher lagged, skipping ahead");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn patch(
        &self,
        scope: &str,
        name: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), DirectoryError> {
        let event = {
            let mut scopes = self.scopes.write();
            let record = scopes
                .entry(scope.to_owned())
                .or_default()
                .entry(name.to_owned())
                .or_default();
            record.annotations.extend(annotations);
            Modification {
                scope: scope.to_owned(),
                labels: record.labels.clone(),
                snapshot: StateSnapshot {
                    name: name.to_owned(),
                    annotations: record.annotations.clone(),
                },
            }
        };

        // No receivers is the normal case when nobody is watching.
        let _ = self.tx.send(event);
        Ok(())
    }

    async fn container_names(
        &self,
        scope: &str,
        name: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        self.with_record(scope, name, |record| record.containers.clone())
    }

    async fn logs(&self, scope: &str, name: &str) -> Result<String, DirectoryError> {
        self.with_record(scope, name, |record| record.logs.clone())
    }
}
