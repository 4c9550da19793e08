//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use civ_types::{Direction, ProductInput};
use parking_lot::Mutex;

use crate::mirror::StateMirror;
use crate::trade::{PurchaseOutcome, Supplier};
use crate::worker::{Worker, WorkerIdentity};

/// Supplier that records every purchase and answers with a fixed outcome.
pub struct StubSupplier {
    outcome: PurchaseOutcome,
    calls: Mutex<Vec<String>>,
}

impl StubSupplier {
    /// A supplier that always answers `outcome`.
    pub fn new(outcome: PurchaseOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Products requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Supplier for StubSupplier {
    async fn purchase(&self, input: &ProductInput) -> PurchaseOutcome {
        self.calls.lock().push(input.product.clone());
        self.outcome
    }
}

/// An input bought from a store named after the product.
pub fn input(product: &str, amount: u32) -> ProductInput {
    ProductInput {
        product: product.to_owned(),
        store: format!("http://{product}-store:8080"),
        amount,
    }
}

/// A direction with a one second interval.
pub fn direction(product: &str, amount: u32, minimum: u32, inputs: &[(&str, u32)]) -> Direction {
    Direction {
        product: product.to_owned(),
        amount,
        minimum,
        interval: 1,
        inputs: inputs.iter().map(|(p, a)| input(p, *a)).collect(),
    }
}

/// A detached worker backed by a [`StubSupplier`].
pub fn worker(directions: Vec<Direction>, outcome: PurchaseOutcome) -> (Worker, Arc<StubSupplier>) {
    let supplier = Arc::new(StubSupplier::new(outcome));
    let worker = Worker::new(
        WorkerIdentity {
            kingdom: String::from("test"),
            name: String::from("tester-0"),
        },
        directions,
        supplier.clone(),
        StateMirror::detached(),
    );
    (worker, supplier)
}
