//! Production rules for a worker.
//!
//! A worker is configured with an ordered list of [`Direction`]s. Each
//! direction names the product it makes, how much it makes per cycle, the
//! readiness threshold, the cadence, and the inputs consumed per cycle.
//! Directions are immutable once loaded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One input required to run a production cycle, and where to buy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    /// Name of the input product.
    pub product: String,
    /// Base URL of the peer worker that sells this product.
    #[serde(alias = "store_address")]
    pub store: String,
    /// Units consumed per production cycle (and bought per purchase).
    pub amount: u32,
}

/// A production rule: what to make, how much, how often, and from what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direction {
    /// Name of the product this rule produces.
    pub product: String,
    /// Units produced per successful cycle.
    pub amount: u32,
    /// Stock level at or above which the worker reports ready.
    #[serde(default)]
    pub minimum: u32,
    /// Seconds to wait before each production attempt.
    pub interval: u64,
    /// Inputs consumed per cycle, checked in order.
    #[serde(default, alias = "product_input_list")]
    pub inputs: Vec<ProductInput>,
}

impl Direction {
    /// The wait before each production attempt as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_inputs() {
        let json = r#"{
            "product": "plank",
            "amount": 2,
            "minimum": 5,
            "interval": 3,
            "inputs": [{"product": "wood", "store": "http://lumberjack:8080", "amount": 4}]
        }"#;
        let direction: Direction = serde_json::from_str(json).unwrap();
        assert_eq!(direction.product, "plank");
        assert_eq!(direction.interval(), Duration::from_secs(3));
        assert_eq!(direction.inputs.len(), 1);
        assert_eq!(direction.inputs.first().map(|i| i.amount), Some(4));
    }

    #[test]
    fn accepts_legacy_field_names() {
        let json = r#"{
            "product": "bread",
            "amount": 1,
            "interval": 1,
            "product_input_list": [{"product": "flour", "store_address": "http://mill", "amount": 2}]
        }"#;
        let direction: Direction = serde_json::from_str(json).unwrap();
        assert_eq!(direction.minimum, 0);
        assert_eq!(
            direction.inputs.first().map(|i| i.store.as_str()),
            Some("http://mill")
        );
    }

    #[test]
    fn rejects_negative_amount() {
        let json = r#"{"product": "wood", "amount": -1, "interval": 1}"#;
        assert!(serde_json::from_str::<Direction>(json).is_err());
    }
}
