//! Per-worker, per-product change tracking.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use civ_types::StateSnapshot;

/// What the view knows about one product of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductDiff {
    /// Latest observed quantity.
    pub current: i64,
    /// `new - old` at the most recent change.
    pub last_delta: i64,
    /// When the most recent change was observed; `None` if it never changed.
    pub last_changed_at: Option<Instant>,
}

impl ProductDiff {
    /// Time since the last change, or `None` if it never changed.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.last_changed_at
            .map(|at| now.saturating_duration_since(at))
    }
}

/// Diff state for every worker seen on the stream.
#[derive(Debug, Clone, Default)]
pub struct DiffState {
    workers: BTreeMap<String, BTreeMap<String, ProductDiff>>,
}

impl DiffState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot in, as observed at `now`.
    ///
    /// Workers and products are created on first sight with a quantity of
    /// zero. Values that do not parse as integers are skipped.
    pub fn record(&mut self, snapshot: &StateSnapshot, now: Instant) {
        let products = self.workers.entry(snapshot.name.clone()).or_default();
        for (product, amount) in snapshot.quantities() {
            let entry = products.entry(product).or_default();
            if amount != entry.current {
                entry.last_delta = amount.saturating_sub(entry.current);
                entry.last_changed_at = Some(now);
            }
            entry.current = amount;
        }
    }

    /// Workers in sorted order with their products in sorted order.
    pub fn workers(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, ProductDiff>)> {
        self.workers
            .iter()
            .map(|(name, products)| (name.as_str(), products))
    }

    /// One product of one worker.
    pub fn get(&self, worker: &str, product: &str) -> Option<&ProductDiff> {
        self.workers.get(worker)?.get(product)
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
