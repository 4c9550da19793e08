//! Peer trades over real sockets.
//!
//! A seller's facade is bound to an ephemeral port and buyers purchase
//! from it through [`HttpTradeClient`].

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use civ_server::{AppState, run_server};
use civ_types::ProductInput;
use civ_worker::{HttpTradeClient, StateMirror, Worker, WorkerIdentity};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn make_worker(name: &str) -> Arc<Worker> {
    Arc::new(Worker::new(
        WorkerIdentity {
            kingdom: String::from("test"),
            name: name.to_owned(),
        },
        Vec::new(),
        Arc::new(HttpTradeClient::new(Duration::from_secs(2)).unwrap()),
        StateMirror::detached(),
    ))
}

async fn start_seller(seller: Arc<Worker>) -> (String, CancellationToken, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            run_server(listener, AppState::new(seller), cancel, Duration::from_secs(1))
                .await
                .unwrap();
        }
    });
    (format!("http://{addr}"), cancel, handle)
}

#[tokio::test]
async fn buy_moves_goods_between_workers() {
    let seller = make_worker("lumberjack-0");
    seller.inventory().add("wood", 5);
    let (store, cancel, handle) = start_seller(seller.clone()).await;

    let buyer = make_worker("carpenter-0");
    let wood = ProductInput {
        product: String::from("wood"),
        store,
        amount: 3,
    };

    assert!(buyer.buy(&wood).await);
    assert_eq!(buyer.inventory().quantity("wood"), 3);
    assert_eq!(seller.inventory().quantity("wood"), 2);

    assert!(!buyer.buy(&wood).await);
    assert_eq!(buyer.inventory().quantity("wood"), 3);
    assert_eq!(seller.inventory().quantity("wood"), 2);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn contending_buyers_never_oversell() {
    let seller = make_worker("lumberjack-0");
    seller.inventory().add("wood", 5);
    let (store, cancel, handle) = start_seller(seller.clone()).await;

    let wood = ProductInput {
        product: String::from("wood"),
        store,
        amount: 3,
    };
    let first = make_worker("carpenter-0");
    let second = make_worker("carpenter-1");

    let (a, b) = tokio::join!(first.buy(&wood), second.buy(&wood));

    assert!(a ^ b, "exactly one buyer should win");
    assert_eq!(seller.inventory().quantity("wood"), 2);
    let bought = first
        .inventory()
        .quantity("wood")
        .checked_add(second.inventory().quantity("wood"))
        .unwrap();
    assert_eq!(bought, 3);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn peer_inventory_is_readable() {
    let seller = make_worker("lumberjack-0");
    seller.inventory().add("wood", 7);
    let (store, cancel, handle) = start_seller(seller).await;

    let client = HttpTradeClient::new(Duration::from_secs(2)).unwrap();
    let inventory = client.inventory(&store).await.unwrap();
    assert_eq!(inventory.get("wood"), Some(&7));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn stalled_request_is_cut_off_after_grace() {
    use tokio::io::AsyncWriteExt;

    let seller = make_worker("lumberjack-0");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let grace = Duration::from_millis(300);
    let server = tokio::spawn(run_server(
        listener,
        AppState::new(seller),
        cancel.clone(),
        grace,
    ));

    // headers promise a body that never fully arrives, keeping the request in flight
    let mut stalled = tokio::net::TcpStream::connect(addr).await.unwrap();
    stalled
        .write_all(
            b"POST /sell HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"item\"",
        )
        .await
        .unwrap();
    stalled.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    let waited = started.elapsed();

    assert!(result.is_ok());
    assert!(waited >= Duration::from_millis(250), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(3), "returned after {waited:?}");
    drop(stalled);
}
