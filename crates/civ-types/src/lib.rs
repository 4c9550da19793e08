//! Shared type definitions for the civ trading simulation.
//!
//! This crate is the single source of truth for the types that cross
//! process boundaries: production rules loaded from the directions file,
//! the trade request payload exchanged between workers, and the inventory
//! snapshots mirrored into the directory and streamed back to observers.
//!
//! # Modules
//!
//! - [`direction`] -- Production rules ([`Direction`], [`ProductInput`])
//! - [`trade`] -- The `/sell` request payload ([`TradeRequest`])
//! - [`snapshot`] -- Inventory snapshots and directory label selectors

pub mod direction;
pub mod snapshot;
pub mod trade;

// Re-export all public types at crate root for convenience.
pub use direction::{Direction, ProductInput};
pub use snapshot::{LabelSelector, LabelSelectorError, StateSnapshot, TOWN_LABEL};
pub use trade::TradeRequest;
