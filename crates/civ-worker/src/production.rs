//! The production loop.
//!
//! Each pass walks the worker's directions in order. For every direction
//! the loop first waits the direction's interval, then attempts one cycle:
//!
//! 1. Check inputs in order. The first input the worker does not hold in
//!    sufficient quantity is bought from its store and the cycle ends
//!    without producing. Later inputs are not looked at.
//! 2. With every input on hand, remove them one by one. If a concurrent
//!    sale drained one in the meantime the cycle stops there; inputs
//!    already removed stay consumed.
//! 3. Add the product.
//!
//! After the pass the loop pauses before starting the next one. Every wait
//! is raced against the cancellation token, so shutdown is prompt.

use std::sync::Arc;
use std::time::Duration;

use civ_types::Direction;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::worker::Worker;

/// Pause between two passes over the directions.
pub const DEFAULT_PASS_PAUSE: Duration = Duration::from_secs(1);

/// How a single production attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// All inputs were consumed and the product was added.
    Produced,
    /// `input` was short; the worker tried to buy it.
    Shortfall {
        /// The first insufficient input.
        input: String,
        /// Whether the purchase succeeded.
        bought: bool,
    },
    /// `input` disappeared between the check and its removal.
    Interrupted {
        /// The input that could not be removed.
        input: String,
    },
}

/// Drives one worker's directions until cancelled.
#[derive(Debug, Clone)]
pub struct ProductionEngine {
    worker: Arc<Worker>,
    pass_pause: Duration,
}

impl ProductionEngine {
    /// Create an engine with the default pass pause.
    pub const fn new(worker: Arc<Worker>) -> Self {
        Self {
            worker,
            pass_pause: DEFAULT_PASS_PAUSE,
        }
    }

    /// Override the pause between passes.
    #[must_use]
    pub const fn with_pass_pause(mut self, pass_pause: Duration) -> Self {
        self.pass_pause = pass_pause;
        self
    }

    /// The worker this engine drives.
    pub const fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    /// Attempt one production cycle for `direction`.
    pub async fn attempt(&self, direction: &Direction) -> CycleOutcome {
        let inventory = self.worker.inventory();

        let shortfall = direction
            .inputs
            .iter()
            .find(|input| !inventory.has(&input.product, input.amount));
        if let Some(input) = shortfall {
            debug!(
                product = %direction.product,
                input = %input.product,
                "not enough input, buying"
            );
            let bought = self.worker.buy(input).await;
            return CycleOutcome::Shortfall {
                input: input.product.clone(),
                bought,
            };
        }

        for input in &direction.inputs {
            if !inventory.remove(&input.product, input.amount) {
                warn!(
                    product = %direction.product,
                    input = %input.product,
                    "input sold out from under production"
                );
                self.worker.mirror_state();
                return CycleOutcome::Interrupted {
                    input: input.product.clone(),
                };
            }
        }

        let total = inventory.add(&direction.product, direction.amount);
        self.worker.mirror_state();
        info!(
            product = %direction.product,
            amount = direction.amount,
            total,
            "produced"
        );
        CycleOutcome::Produced
    }

    /// Run passes over the directions until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let identity = self.worker.identity();
        info!(
            kingdom = %identity.kingdom,
            worker = %identity.name,
            directions = self.worker.directions().len(),
            "production loop started"
        );

        'passes: loop {
            for direction in self.worker.directions() {
                tokio::select! {
                    () = cancel.cancelled() => break 'passes,
                    () = tokio::time::sleep(direction.interval()) => {}
                }
                tokio::select! {
                    () = cancel.cancelled() => break 'passes,
                    _ = self.attempt(direction) => {}
                }
            }
            tokio::select! {
                () = cancel.cancelled() => break 'passes,
                () = tokio::time::sleep(self.pass_pause) => {}
            }
        }

        info!(worker = %identity.name, "production loop stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::test_support::{StubSupplier, direction, worker};
    use crate::trade::PurchaseOutcome;

    fn engine(
        directions: Vec<Direction>,
        outcome: PurchaseOutcome,
    ) -> (ProductionEngine, Arc<StubSupplier>) {
        let (worker, supplier) = worker(directions, outcome);
        (ProductionEngine::new(Arc::new(worker)), supplier)
    }

    #[tokio::test]
    async fn first_shortfall_is_bought_and_nothing_else_moves() {
        let tools = direction("tools", 1, 0, &[("wood", 2), ("stone", 1)]);
        let (engine, supplier) = engine(vec![tools.clone()], PurchaseOutcome::Sold);
        let inventory = engine.worker().inventory();
        inventory.add("wood", 1);

        let outcome = engine.attempt(&tools).await;

        assert_eq!(
            outcome,
            CycleOutcome::Shortfall {
                input: String::from("wood"),
                bought: true,
            }
        );
        assert_eq!(supplier.calls(), vec![String::from("wood")]);
        assert_eq!(inventory.quantity("wood"), 3);
        assert_eq!(inventory.quantity("stone"), 0);
        assert_eq!(inventory.quantity("tools"), 0);
    }

    #[tokio::test]
    async fn failed_purchase_defers_the_cycle() {
        let tools = direction("tools", 1, 0, &[("wood", 2)]);
        let (engine, supplier) = engine(vec![tools.clone()], PurchaseOutcome::OutOfStock);

        let outcome = engine.attempt(&tools).await;

        assert_eq!(
            outcome,
            CycleOutcome::Shortfall {
                input: String::from("wood"),
                bought: false,
            }
        );
        assert_eq!(supplier.calls().len(), 1);
        assert!(engine.worker().snapshot().is_empty());
    }

    #[tokio::test]
    async fn full_cycle_consumes_inputs_and_adds_product() {
        let tools = direction("tools", 3, 0, &[("wood", 2), ("stone", 1)]);
        let (engine, supplier) = engine(vec![tools.clone()], PurchaseOutcome::Sold);
        let inventory = engine.worker().inventory();
        inventory.add("wood", 5);
        inventory.add("stone", 1);

        assert_eq!(engine.attempt(&tools).await, CycleOutcome::Produced);

        assert!(supplier.calls().is_empty());
        assert_eq!(inventory.quantity("wood"), 3);
        assert_eq!(inventory.quantity("stone"), 0);
        assert_eq!(inventory.quantity("tools"), 3);
    }

    #[tokio::test]
    async fn drained_input_interrupts_without_rollback() {
        // both requirements pass the check individually, but only one can be removed
        let planks = direction("planks", 1, 0, &[("wood", 2), ("wood", 2)]);
        let (engine, supplier) = engine(vec![planks.clone()], PurchaseOutcome::Sold);
        let inventory = engine.worker().inventory();
        inventory.add("wood", 3);

        let outcome = engine.attempt(&planks).await;

        assert_eq!(
            outcome,
            CycleOutcome::Interrupted {
                input: String::from("wood"),
            }
        );
        assert!(supplier.calls().is_empty());
        assert_eq!(inventory.quantity("wood"), 1);
        assert_eq!(inventory.quantity("planks"), 0);
    }

    #[tokio::test]
    async fn never_stocked_input_is_a_shortfall_even_for_zero() {
        let tools = direction("tools", 1, 0, &[("catalyst", 0)]);
        let (engine, supplier) = engine(vec![tools.clone()], PurchaseOutcome::Sold);

        assert_eq!(
            engine.attempt(&tools).await,
            CycleOutcome::Shortfall {
                input: String::from("catalyst"),
                bought: true,
            }
        );
        assert_eq!(engine.attempt(&tools).await, CycleOutcome::Produced);
        assert_eq!(engine.attempt(&tools).await, CycleOutcome::Produced);

        assert_eq!(supplier.calls(), vec![String::from("catalyst")]);
        assert_eq!(engine.worker().inventory().quantity("tools"), 2);
    }

    #[tokio::test]
    async fn direction_without_inputs_always_produces() {
        let wood = direction("wood", 2, 0, &[]);
        let (engine, _) = engine(vec![wood.clone()], PurchaseOutcome::Sold);
        assert_eq!(engine.attempt(&wood).await, CycleOutcome::Produced);
        assert_eq!(engine.attempt(&wood).await, CycleOutcome::Produced);
        assert_eq!(engine.worker().inventory().quantity("wood"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_produces_on_interval_until_cancelled() {
        let wood = direction("wood", 1, 0, &[]);
        let (engine, _) = engine(vec![wood], PurchaseOutcome::Sold);
        let worker = engine.worker().clone();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(engine.run(cancel.clone()));

        // interval 1s + pass pause 1s: produced at t=1, t=3, t=5
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(worker.inventory().quantity("wood"), 3);

        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(worker.inventory().quantity("wood"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn directions_run_in_order_with_their_own_intervals() {
        let mut wood = direction("wood", 1, 0, &[]);
        wood.interval = 1;
        let mut stone = direction("stone", 1, 0, &[]);
        stone.interval = 3;
        let (engine, _) = engine(vec![wood, stone], PurchaseOutcome::Sold);
        let worker = engine.worker().clone();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(engine.run(cancel.clone()));

        // wood at t=1, stone at t=4, pause until t=5, wood at t=6, stone at t=9
        let expected = [
            (500, 0, 0),
            (1500, 1, 0),
            (3500, 1, 0),
            (4500, 1, 1),
            (5500, 1, 1),
            (6500, 2, 1),
            (8500, 2, 1),
            (9500, 2, 2),
        ];
        let mut elapsed = 0;
        for (at_ms, wood, stone) in expected {
            tokio::time::sleep(Duration::from_millis(at_ms - elapsed)).await;
            elapsed = at_ms;
            let inventory = worker.inventory();
            assert_eq!(
                (inventory.quantity("wood"), inventory.quantity("stone")),
                (wood, stone),
                "at {at_ms}ms"
            );
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_interval_stops_immediately() {
        let mut slow = direction("wood", 1, 0, &[]);
        slow.interval = 3600;
        let (engine, _) = engine(vec![slow], PurchaseOutcome::Sold);
        let worker = engine.worker().clone();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(engine.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(worker.snapshot().is_empty());
    }
}
