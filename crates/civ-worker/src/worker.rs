//! The worker: one agent with its inventory, directions, and trade links.
//!
//! All inventory mutations go through [`Inventory`]'s atomic operations.
//! The worker adds the side effects the rest of the system relies on:
//! mirroring after each successful mutation and logging each trade.

use std::collections::BTreeMap;
use std::sync::Arc;

use civ_types::{Direction, ProductInput, StateSnapshot};
use tracing::{debug, info};

use crate::inventory::Inventory;
use crate::mirror::StateMirror;
use crate::trade::{PurchaseOutcome, Supplier};

/// Where a worker lives in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    /// Scope (namespace) the worker belongs to.
    pub kingdom: String,
    /// The worker's own record name.
    pub name: String,
}

/// A single production-and-trade agent.
pub struct Worker {
    identity: WorkerIdentity,
    directions: Vec<Direction>,
    inventory: Inventory,
    supplier: Arc<dyn Supplier>,
    mirror: StateMirror,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("identity", &self.identity)
            .field("directions", &self.directions.len())
            .field("inventory", &self.inventory)
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Create a worker with an empty inventory.
    pub fn new(
        identity: WorkerIdentity,
        directions: Vec<Direction>,
        supplier: Arc<dyn Supplier>,
        mirror: StateMirror,
    ) -> Self {
        Self {
            identity,
            directions,
            inventory: Inventory::new(),
            supplier,
            mirror,
        }
    }

    /// The worker's directory identity.
    pub const fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// The configured directions, in processing order.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// The worker's inventory.
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// A copy of the current inventory.
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.inventory.snapshot()
    }

    /// The current inventory in directory encoding.
    pub fn state_snapshot(&self) -> StateSnapshot {
        StateSnapshot::from_quantities(self.identity.name.clone(), &self.snapshot())
    }

    /// Whether every direction's product is stocked at or above its minimum.
    ///
    /// Evaluated against a single snapshot so the answer is consistent.
    pub fn is_ready(&self) -> bool {
        let stock = self.snapshot();
        self.directions.iter().all(|direction| {
            stock.get(&direction.product).copied().unwrap_or(0) >= direction.minimum
        })
    }

    /// Hand over `quantity` of `item` to a buyer.
    ///
    /// Returns `false` when the item is missing or short; nothing changes.
    pub fn sell(&self, item: &str, quantity: u32) -> bool {
        if !self.inventory.remove(item, quantity) {
            debug!(item, quantity, "not enough inventory to sell");
            return false;
        }
        debug!(item, quantity, "sold");
        self.mirror_state();
        true
    }

    /// Buy `input` from its store and stock it on success.
    ///
    /// The network call is made without holding the inventory lock.
    pub async fn buy(&self, input: &ProductInput) -> bool {
        match self.supplier.purchase(input).await {
            PurchaseOutcome::Sold => {
                self.inventory.add(&input.product, input.amount);
                self.mirror_state();
                info!(
                    product = %input.product,
                    amount = input.amount,
                    store = %input.store,
                    "purchased"
                );
                true
            }
            PurchaseOutcome::OutOfStock | PurchaseOutcome::Failed => {
                debug!(
                    product = %input.product,
                    store = %input.store,
                    amount = input.amount,
                    "failed to buy input"
                );
                false
            }
        }
    }

    /// Queue the current inventory for the directory mirror.
    pub(crate) fn mirror_state(&self) {
        self.mirror.publish(&self.snapshot());
    }
}
