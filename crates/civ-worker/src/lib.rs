//! Worker agents for the civ trading simulation.
//!
//! A worker owns one [`Inventory`] and an ordered list of production
//! [`Direction`]s. Its [`ProductionEngine`] repeatedly tries to run each
//! direction; when an input is short it buys from the peer named in the
//! direction through a [`Supplier`] and defers the cycle. Every successful
//! mutation is mirrored, best effort, into the directory by a
//! [`StateMirror`].
//!
//! # Modules
//!
//! - [`directions`] -- Loading and validating the directions file
//! - [`inventory`] -- The lock-guarded product store
//! - [`trade`] -- Outbound purchases from peer workers
//! - [`mirror`] -- Background propagation of snapshots to the directory
//! - [`worker`] -- The worker: identity, inventory, sell/buy/readiness
//! - [`production`] -- The per-worker production loop
//!
//! [`Direction`]: civ_types::Direction

pub mod directions;
pub mod error;
pub mod inventory;
pub mod mirror;
pub mod production;
pub mod trade;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use directions::{load_directions, parse_directions};
pub use error::{DirectionsError, TradeError};
pub use inventory::Inventory;
pub use mirror::StateMirror;
pub use production::{CycleOutcome, DEFAULT_PASS_PAUSE, ProductionEngine};
pub use trade::{HttpTradeClient, PurchaseOutcome, Supplier};
pub use worker::{Worker, WorkerIdentity};
