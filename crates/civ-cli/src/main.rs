//! `civ`: worker agents trading goods across a kingdom.
//!
//! # Commands
//!
//! - `civ serve <directions>` -- run one worker: production loop, trade
//!   facade, and directory mirror
//! - `civ directory` -- run the in-memory directory service
//! - `civ watch [--town]` -- live, fading diff view of every inventory
//! - `civ kingdoms` -- list kingdoms
//! - `civ towns` -- list the towns of a kingdom
//! - `civ workers [--town]` -- list registered workers
//! - `civ containers <worker>` / `civ logs <worker>` -- inspect a worker record
//! - `civ inventory <url>` -- read a worker's inventory through its facade
//!
//! Logs go to stderr so they never interleave with the watch view. Set
//! `CIV_LOG_FORMAT=json` for JSON lines. A serving worker also appends its
//! log lines to its directory record, where `civ logs` reads them.

mod commands;
mod config;
mod error;
mod logsink;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{CivConfig, DEFAULT_CONFIG_FILE};
use crate::logsink::{DirectoryLogLayer, LOG_QUEUE};

/// Worker agents trading goods across a kingdom
#[derive(Debug, Parser)]
#[command(name = "civ")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "CIV_CONFIG",
        value_name = "FILE",
        default_value = DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Kingdom (directory scope); overrides the config file
    #[arg(short, long, global = true)]
    kingdom: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a worker from a directions file
    Serve {
        /// JSON file with the worker's directions
        directions: PathBuf,
    },

    /// Run the directory service
    Directory,

    /// Watch inventories change live
    Watch {
        /// Only show workers in this town
        #[arg(long)]
        town: Option<String>,
    },

    /// List kingdoms known to the directory
    Kingdoms,

    /// List the towns of the kingdom
    Towns,

    /// List workers in the kingdom
    Workers {
        /// Only list workers in this town
        #[arg(long)]
        town: Option<String>,
    },

    /// List a worker's containers
    Containers {
        /// Worker record name
        worker: String,
    },

    /// Print a worker's logs
    Logs {
        /// Worker record name
        worker: String,
    },

    /// Print a worker's inventory from its trade facade
    Inventory {
        /// Base URL of the worker, e.g. `http://mill-0:8080`
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_lines = init_logging();

    let mut config = CivConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(kingdom) = cli.kingdom {
        config.worker.kingdom = kingdom;
    }

    match cli.command {
        Command::Serve { directions } => {
            commands::serve(&config, &directions, log_lines).await?;
        }
        Command::Directory => commands::directory(&config).await?,
        Command::Watch { town } => commands::watch(&config, town).await?,
        Command::Kingdoms => commands::kingdoms(&config).await?,
        Command::Towns => commands::towns(&config).await?,
        Command::Workers { town } => commands::workers(&config, town).await?,
        Command::Containers { worker } => commands::containers(&config, &worker).await?,
        Command::Logs { worker } => commands::logs(&config, &worker).await?,
        Command::Inventory { url } => commands::inventory(&config, &url).await?,
    }
    Ok(())
}

/// Structured logging to stderr, filtered by `RUST_LOG` (default `info`).
///
/// Returns the queue of formatted lines destined for the directory.
fn init_logging() -> mpsc::Receiver<String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CIV_LOG_FORMAT").is_ok_and(|format| format == "json");
    let stderr = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };
    let (directory_layer, lines) = DirectoryLogLayer::new(LOG_QUEUE);

    tracing_subscriber::registry()
        .with(stderr)
        .with(directory_layer)
        .with(filter)
        .init();
    lines
}
