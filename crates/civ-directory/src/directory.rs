//! The [`Directory`] trait and its supporting types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use civ_types::{LabelSelector, StateSnapshot};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Stream of modification events produced by [`Directory::watch`].
///
/// Each item carries the record name and its full annotation map after the
/// modification. The stream ends when the backend closes it; dropping it
/// releases the backend's producer.
pub type WatchStream = BoxStream<'static, StateSnapshot>;

/// Registration payload for a record: labels used by selectors and the
/// names of the containers running under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    /// Labels matched by [`LabelSelector`]s.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Container names reported by [`Directory::container_names`].
    #[serde(default)]
    pub containers: Vec<String>,
}

/// The five directory primitives the workers and observers depend on.
///
/// `scope` is the kingdom a record lives in. Implementations must be safe
/// to share between tasks.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Names of the records in `scope`, optionally filtered by label,
    /// sorted ascending.
    async fn list_names(
        &self,
        scope: &str,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<String>, DirectoryError>;

    /// Subscribe to modification events in `scope`.
    ///
    /// Only modifications made after the subscription is established are
    /// delivered; registrations are not modifications.
    async fn watch(
        &self,
        scope: &str,
        selector: Option<LabelSelector>,
    ) -> Result<WatchStream, DirectoryError>;

    /// Merge `annotations` into the record `name`, creating it if absent.
    async fn patch(
        &self,
        scope: &str,
        name: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), DirectoryError>;

    /// Container names registered for the record `name`.
    async fn container_names(&self, scope: &str, name: &str)
    -> Result<Vec<String>, DirectoryError>;

    /// Log text accumulated for the record `name`.
    async fn logs(&self, scope: &str, name: &str) -> Result<String, DirectoryError>;
}

/// Destination for a record's log text. Written by workers, read back
/// through [`Directory::logs`].
#[async_trait]
pub trait LogAppender: Send + Sync {
    /// Append `text` to the logs of the record `name`.
    async fn append_logs(&self, scope: &str, name: &str, text: String)
    -> Result<(), DirectoryError>;
}
