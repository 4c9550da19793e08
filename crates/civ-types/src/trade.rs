//! Trade request payload.

use serde::{Deserialize, Serialize};

/// Body of `POST /sell`: the buyer asks the seller for `quantity` of `item`.
///
/// Exists only for the duration of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Product name being bought.
    pub item: String,
    /// Units requested.
    pub quantity: u32,
}

impl TradeRequest {
    /// Build a request for `quantity` units of `item`.
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}
