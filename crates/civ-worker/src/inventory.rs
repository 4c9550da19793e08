//! The worker's product store.
//!
//! [`Inventory`] is the only owner of the product map. Every operation takes
//! the lock for its full duration, so [`remove`](Inventory::remove) is an
//! atomic check-then-decrement. Callers must not compose
//! [`has`](Inventory::has) and [`remove`](Inventory::remove) expecting
//! atomicity across the two calls; a concurrent sale can land in between.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// A lock-guarded mapping of product name to non-negative quantity.
#[derive(Debug, Default)]
pub struct Inventory {
    stock: RwLock<BTreeMap<String, u32>>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increase `product` by `amount`, creating the entry if absent.
    ///
    /// Saturates at `u32::MAX`. Returns the new quantity.
    pub fn add(&self, product: &str, amount: u32) -> u32 {
        let mut stock = self.stock.write();
        let quantity = stock.entry(product.to_owned()).or_insert(0);
        *quantity = quantity.saturating_add(amount);
        *quantity
    }

    /// Whether `product` is stocked with at least `amount`.
    ///
    /// A product that was never stocked is never had, even for zero, so
    /// `has` and [`remove`](Inventory::remove) agree on absent products.
    pub fn has(&self, product: &str, amount: u32) -> bool {
        self.stock
            .read()
            .get(product)
            .is_some_and(|quantity| *quantity >= amount)
    }

    /// Current quantity of `product`, zero if never stocked.
    pub fn quantity(&self, product: &str) -> u32 {
        self.stock.read().get(product).copied().unwrap_or(0)
    }

    /// Take `amount` of `product` if, and only if, enough is in stock.
    ///
    /// Returns `false` without mutating anything when the product was never
    /// stocked or the quantity is insufficient.
    pub fn remove(&self, product: &str, amount: u32) -> bool {
        let mut stock = self.stock.write();
        let Some(quantity) = stock.get_mut(product) else {
            return false;
        };
        match quantity.checked_sub(amount) {
            Some(rest) => {
                *quantity = rest;
                true
            }
            None => false,
        }
    }

    /// A copy of the whole map.
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.stock.read().clone()
    }
}
