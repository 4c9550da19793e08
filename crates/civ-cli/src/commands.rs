//! Subcommand implementations.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use civ_directory::{Directory, HttpDirectory, LogAppender, MemoryDirectory, RecordSpec, service};
use civ_server::{AppState, run_server};
use civ_types::{LabelSelector, TOWN_LABEL};
use civ_worker::{
    HttpTradeClient, ProductionEngine, StateMirror, Worker, WorkerIdentity, load_directions,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::CivConfig;
use crate::error::CliError;
use crate::logsink::{FLUSH_PERIOD, forward_logs};

/// Container name every worker record carries.
const WORKER_CONTAINER: &str = "worker";

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, shutting down"),
            Err(e) => warn!(error = %e, "failed to listen for interrupt, shutting down"),
        }
        token.cancel();
    });
}

async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener, CliError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind { addr, source })
}

fn town_selector(town: Option<String>) -> Option<LabelSelector> {
    town.filter(|t| !t.is_empty()).map(LabelSelector::town)
}

/// `civ serve <directions>`
///
/// `log_lines` are appended to the worker's directory record while it runs.
pub async fn serve(
    config: &CivConfig,
    directions_path: &Path,
    log_lines: mpsc::Receiver<String>,
) -> Result<(), CliError> {
    let settings = &config.worker;
    let name = settings.require_name()?.to_owned();
    let listen_addr = settings.listen_addr()?;
    let directions = load_directions(directions_path)?;

    info!(
        kingdom = %settings.kingdom,
        worker = %name,
        town = %settings.town,
        directions = directions.len(),
        "worker starting"
    );
    for direction in &directions {
        info!(
            product = %direction.product,
            amount = direction.amount,
            minimum = direction.minimum,
            interval_secs = direction.interval,
            inputs = direction.inputs.len(),
            "direction loaded"
        );
    }

    let directory = Arc::new(HttpDirectory::new(config.directory.url.clone()));
    register(&directory, config, &name).await;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let logs = tokio::spawn(forward_logs(
        log_lines,
        directory.clone(),
        settings.kingdom.clone(),
        name.clone(),
        FLUSH_PERIOD,
        cancel.clone(),
    ));

    let mirror = StateMirror::spawn(
        directory.clone(),
        settings.kingdom.clone(),
        name.clone(),
        cancel.clone(),
    );
    let supplier = Arc::new(HttpTradeClient::new(settings.trade_timeout())?);
    let worker = Arc::new(Worker::new(
        WorkerIdentity {
            kingdom: settings.kingdom.clone(),
            name,
        },
        directions,
        supplier,
        mirror,
    ));

    let engine = ProductionEngine::new(worker.clone()).with_pass_pause(settings.pass_pause());
    let production = tokio::spawn(engine.run(cancel.clone()));

    let listener = bind(listen_addr).await?;
    let served = run_server(
        listener,
        AppState::new(worker),
        cancel.clone(),
        settings.shutdown_grace(),
    )
    .await;

    cancel.cancel();
    if let Err(e) = production.await {
        warn!(error = %e, "production task failed");
    }
    info!("worker stopped");
    if let Err(e) = logs.await {
        warn!(error = %e, "log forwarding task failed");
    }
    served?;
    Ok(())
}

/// Record this worker in the directory. Failures are logged only.
async fn register(directory: &HttpDirectory, config: &CivConfig, name: &str) {
    let settings = &config.worker;
    let mut labels = BTreeMap::new();
    if !settings.town.is_empty() {
        labels.insert(TOWN_LABEL.to_owned(), settings.town.clone());
    }
    let spec = RecordSpec {
        labels,
        containers: vec![WORKER_CONTAINER.to_owned()],
    };

    if let Err(e) = directory.register(&settings.kingdom, name, &spec).await {
        warn!(
            directory = %config.directory.url,
            error = %e,
            "failed to register with directory"
        );
        return;
    }
    let line = format!("worker {name} started in town {:?}\n", settings.town);
    if let Err(e) = directory.append_logs(&settings.kingdom, name, line).await {
        warn!(error = %e, "failed to append startup log");
    }
}

/// `civ directory`
pub async fn directory(config: &CivConfig) -> Result<(), CliError> {
    let listener = bind(config.directory.listen_addr()?).await?;
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    service::serve(listener, Arc::new(MemoryDirectory::new()), shutdown)
        .await
        .map_err(CliError::Service)
}

/// `civ watch`
pub async fn watch(config: &CivConfig, town: Option<String>) -> Result<(), CliError> {
    let directory = HttpDirectory::new(config.directory.url.clone());
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    civ_watch::watch(
        &directory,
        &config.worker.kingdom,
        town_selector(town),
        config.watch.to_watch_config(),
        cancel,
        std::io::stdout(),
    )
    .await?;

    println!("\nExiting watch command...");
    Ok(())
}

/// `civ kingdoms`
pub async fn kingdoms(config: &CivConfig) -> Result<(), CliError> {
    let directory = HttpDirectory::new(config.directory.url.clone());
    for kingdom in directory.list_scopes().await? {
        println!("{kingdom}");
    }
    Ok(())
}

/// `civ towns`
pub async fn towns(config: &CivConfig) -> Result<(), CliError> {
    let directory = HttpDirectory::new(config.directory.url.clone());
    for town in directory
        .label_values(&config.worker.kingdom, TOWN_LABEL)
        .await?
    {
        println!("{town}");
    }
    Ok(())
}

/// `civ workers`
pub async fn workers(config: &CivConfig, town: Option<String>) -> Result<(), CliError> {
    let directory = HttpDirectory::new(config.directory.url.clone());
    let selector = town_selector(town);
    for name in directory
        .list_names(&config.worker.kingdom, selector.as_ref())
        .await?
    {
        println!("{name}");
    }
    Ok(())
}

/// `civ containers <worker>`
pub async fn containers(config: &CivConfig, worker: &str) -> Result<(), CliError> {
    let directory = HttpDirectory::new(config.directory.url.clone());
    for name in directory
        .container_names(&config.worker.kingdom, worker)
        .await?
    {
        println!("{name}");
    }
    Ok(())
}

/// `civ logs <worker>`
pub async fn logs(config: &CivConfig, worker: &str) -> Result<(), CliError> {
    let directory = HttpDirectory::new(config.directory.url.clone());
    let text = directory.logs(&config.worker.kingdom, worker).await?;
    print!("{text}");
    Ok(())
}

/// `civ inventory <url>`
pub async fn inventory(config: &CivConfig, url: &str) -> Result<(), CliError> {
    let client = HttpTradeClient::new(config.worker.trade_timeout())?;
    for (product, amount) in client.inventory(url).await? {
        println!("{product} {amount}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_town_means_no_selector() {
        assert_eq!(town_selector(None), None);
        assert_eq!(town_selector(Some(String::new())), None);
        assert_eq!(
            town_selector(Some(String::from("riverbend"))),
            Some(LabelSelector::town("riverbend"))
        );
    }
}
