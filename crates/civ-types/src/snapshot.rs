//! Inventory snapshots as they travel through the directory.
//!
//! The directory stores string-valued annotations on each worker record, so
//! an inventory is encoded as `product -> decimal string` when mirrored and
//! decoded again by observers. Decoding is lenient: a value that does not
//! parse as an integer is dropped and the rest of the map is kept.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label key grouping workers into towns inside a kingdom.
pub const TOWN_LABEL: &str = "town";

/// A point-in-time copy of one worker's inventory, in directory encoding.
///
/// This is both the payload of a mirror patch and the item emitted by a
/// directory watch stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Name of the worker record.
    pub name: String,
    /// Product name to quantity, quantities as decimal strings.
    pub annotations: BTreeMap<String, String>,
}

impl StateSnapshot {
    /// Encode an inventory snapshot for the directory.
    pub fn from_quantities(name: impl Into<String>, quantities: &BTreeMap<String, u32>) -> Self {
        Self {
            name: name.into(),
            annotations: quantities
                .iter()
                .map(|(product, amount)| (product.clone(), amount.to_string()))
                .collect(),
        }
    }

    /// Decode the annotation map back into integer quantities.
    ///
    /// Entries whose value is not an integer are skipped.
    pub fn quantities(&self) -> BTreeMap<String, i64> {
        self.annotations
            .iter()
            .filter_map(|(product, raw)| {
                raw.parse::<i64>().ok().map(|amount| (product.clone(), amount))
            })
            .collect()
    }
}

/// Errors from parsing a [`LabelSelector`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelSelectorError {
    /// The selector was not of the form `key=value`.
    #[error("label selector must look like key=value, got {0:?}")]
    Malformed(String),
}

/// An equality selector on a single label, written `key=value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSelector {
    key: String,
    value: String,
}

impl LabelSelector {
    /// Selector matching records whose `key` label equals `value`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for `town=<town>`.
    pub fn town(town: impl Into<String>) -> Self {
        Self::new(TOWN_LABEL, town)
    }

    /// Whether a record carrying `labels` is selected.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key).is_some_and(|v| *v == self.value)
    }
}

impl FromStr for LabelSelector {
    type Err = LabelSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(LabelSelectorError::Malformed(s.to_owned())),
        }
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
