//! Outbound purchases from peer workers.
//!
//! A purchase is a single synchronous `POST {store}/sell` carrying a
//! [`TradeRequest`]. The seller arbitrates concurrent buyers with its own
//! atomic check-then-decrement; the buyer only learns the verdict:
//!
//! | Status | Outcome |
//! |--------|---------|
//! | `200` | [`PurchaseOutcome::Sold`] |
//! | `409` | [`PurchaseOutcome::OutOfStock`] |
//! | anything else, or a transport error | [`PurchaseOutcome::Failed`] |
//!
//! None of these are fatal. The production loop retries naturally on its
//! next cycle.
//!
//! The [`Supplier`] trait is the seam between the production loop and the
//! network so the loop can be exercised without peers.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use civ_types::{ProductInput, TradeRequest};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::TradeError;

/// Default per-request timeout for peer trades.
pub const DEFAULT_TRADE_TIMEOUT: Duration = Duration::from_secs(5);

/// How a purchase attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The seller handed over the goods.
    Sold,
    /// The seller did not have enough stock.
    OutOfStock,
    /// The trade could not be completed for any other reason.
    Failed,
}

/// A source of input products.
#[async_trait]
pub trait Supplier: Send + Sync {
    /// Try to buy `input.amount` of `input.product` from `input.store`.
    ///
    /// Must not be called while holding the buyer's inventory lock.
    async fn purchase(&self, input: &ProductInput) -> PurchaseOutcome;
}

/// [`Supplier`] that trades with peer workers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTradeClient {
    client: reqwest::Client,
}

impl HttpTradeClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TradeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Create a client from an existing [`reqwest::Client`].
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send the sell request and return the seller's status.
    async fn send_sell(&self, input: &ProductInput) -> Result<StatusCode, TradeError> {
        let request = TradeRequest::new(input.product.clone(), input.amount);
        let response = self
            .client
            .post(format!("{}/sell", input.store.trim_end_matches('/')))
            .json(&request)
            .send()
            .await?;
        Ok(response.status())
    }

    /// Fetch a peer's full inventory from `GET {store}/inventory`.
    pub async fn inventory(&self, store: &str) -> Result<BTreeMap<String, u32>, TradeError> {
        let response = self
            .client
            .get(format!("{}/inventory", store.trim_end_matches('/')))
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TradeError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Supplier for HttpTradeClient {
    async fn purchase(&self, input: &ProductInput) -> PurchaseOutcome {
        match self.send_sell(input).await {
            Ok(StatusCode::OK) => PurchaseOutcome::Sold,
            Ok(StatusCode::CONFLICT) => {
                debug!(
                    product = %input.product,
                    store = %input.store,
                    "store could not fulfil buy request, insufficient inventory"
                );
                PurchaseOutcome::OutOfStock
            }
            Ok(status) => {
                debug!(
                    product = %input.product,
                    store = %input.store,
                    status = status.as_u16(),
                    "unexpected status from store"
                );
                PurchaseOutcome::Failed
            }
            Err(e) => {
                warn!(
                    product = %input.product,
                    store = %input.store,
                    error = %e,
                    "failed to send buy request"
                );
                PurchaseOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_store_is_a_soft_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpTradeClient::new(Duration::from_millis(500)).unwrap();
        let input = ProductInput {
            product: String::from("wood"),
            store: format!("http://{addr}"),
            amount: 1,
        };
        assert_eq!(client.purchase(&input).await, PurchaseOutcome::Failed);
    }
}
