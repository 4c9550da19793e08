//! Configuration loading for the `civ` binary.
//!
//! Settings live in `civ-config.yaml` in the working directory, or in the
//! file named by `--config` / `CIV_CONFIG`. Every field has a default, so
//! a missing file is not an error. A handful of environment variables
//! override the file so deployments can set identity without editing it.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use civ_watch::WatchConfig;
use serde::Deserialize;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "civ-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A setting has a value the binary cannot use.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted path of the setting.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CivConfig {
    /// Settings for `civ serve`.
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Where the directory lives.
    #[serde(default)]
    pub directory: DirectorySettings,

    /// Settings for `civ watch`.
    #[serde(default)]
    pub watch: WatchSettings,
}

impl CivConfig {
    /// Load from `path`, or defaults if `path` does not exist, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::parse(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override settings from variables returned by `lookup`.
    ///
    /// - `CIV_KINGDOM` overrides `worker.kingdom`
    /// - `CIV_WORKER_NAME`, then `HOSTNAME`, override `worker.name`
    /// - `CIV_TOWN` overrides `worker.town`
    /// - `CIV_LISTEN_ADDR` overrides `worker.listen_addr`
    /// - `CIV_DIRECTORY_URL` overrides `directory.url`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("CIV_KINGDOM") {
            self.worker.kingdom = val;
        }
        if let Some(val) = lookup("CIV_WORKER_NAME").or_else(|| lookup("HOSTNAME")) {
            self.worker.name = val;
        }
        if let Some(val) = lookup("CIV_TOWN") {
            self.worker.town = val;
        }
        if let Some(val) = lookup("CIV_LISTEN_ADDR") {
            self.worker.listen_addr = val;
        }
        if let Some(val) = lookup("CIV_DIRECTORY_URL") {
            self.directory.url = val;
        }
    }
}

/// Worker process settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerSettings {
    /// Directory scope the worker registers in.
    #[serde(default = "default_kingdom")]
    pub kingdom: String,

    /// The worker's record name. Usually taken from `HOSTNAME`.
    #[serde(default)]
    pub name: String,

    /// Town label; empty means no label.
    #[serde(default)]
    pub town: String,

    /// Trade facade bind address.
    #[serde(default = "default_worker_listen_addr")]
    pub listen_addr: String,

    /// Pause after each pass over the directions, in milliseconds.
    #[serde(default = "default_pass_pause_ms")]
    pub pass_pause_ms: u64,

    /// Time in-flight trades get on shutdown, in seconds.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Timeout for one outbound trade, in milliseconds.
    #[serde(default = "default_trade_timeout_ms")]
    pub trade_timeout_ms: u64,
}

impl WorkerSettings {
    /// Parsed facade bind address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("worker.listen_addr", &self.listen_addr)
    }

    /// The worker name, which must be set by now.
    pub fn require_name(&self) -> Result<&str, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "worker.name",
                reason: String::from("set it in the config file, CIV_WORKER_NAME or HOSTNAME"),
            });
        }
        Ok(&self.name)
    }

    /// Pause after each pass over the directions.
    pub const fn pass_pause(&self) -> Duration {
        Duration::from_millis(self.pass_pause_ms)
    }

    /// Time in-flight trades get once shutdown starts.
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Timeout for one outbound trade.
    pub const fn trade_timeout(&self) -> Duration {
        Duration::from_millis(self.trade_timeout_ms)
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            kingdom: default_kingdom(),
            name: String::new(),
            town: String::new(),
            listen_addr: default_worker_listen_addr(),
            pass_pause_ms: default_pass_pause_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            trade_timeout_ms: default_trade_timeout_ms(),
        }
    }
}

/// Directory settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectorySettings {
    /// Base URL clients use to reach the directory service.
    #[serde(default = "default_directory_url")]
    pub url: String,

    /// Bind address for `civ directory`.
    #[serde(default = "default_directory_listen_addr")]
    pub listen_addr: String,
}

impl DirectorySettings {
    /// Parsed service bind address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("directory.listen_addr", &self.listen_addr)
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            url: default_directory_url(),
            listen_addr: default_directory_listen_addr(),
        }
    }
}

/// Watch view settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchSettings {
    /// Redraw period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Highlight duration in milliseconds.
    #[serde(default = "default_fade_window_ms")]
    pub fade_window_ms: u64,
}

impl WatchSettings {
    /// Timing for the renderer. A zero tick is raised to one millisecond.
    pub fn to_watch_config(&self) -> WatchConfig {
        WatchConfig {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            fade_window: Duration::from_millis(self.fade_window_ms),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            fade_window_ms: default_fade_window_ms(),
        }
    }
}

fn parse_addr(field: &'static str, raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        field,
        reason: format!("{raw:?} is not a socket address: {e}"),
    })
}

fn default_kingdom() -> String {
    String::from("civ")
}

fn default_worker_listen_addr() -> String {
    String::from("0.0.0.0:8080")
}

const fn default_pass_pause_ms() -> u64 {
    1000
}

const fn default_shutdown_grace_secs() -> u64 {
    10
}

const fn default_trade_timeout_ms() -> u64 {
    5000
}

fn default_directory_url() -> String {
    String::from("http://127.0.0.1:7070")
}

fn default_directory_listen_addr() -> String {
    String::from("0.0.0.0:7070")
}

const fn default_tick_ms() -> u64 {
    200
}

const fn default_fade_window_ms() -> u64 {
    5000
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = CivConfig::parse("{}").unwrap();
        assert_eq!(config, CivConfig::default());
        assert_eq!(config.worker.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.worker.pass_pause(), Duration::from_secs(1));
        assert_eq!(config.worker.shutdown_grace(), Duration::from_secs(10));
        assert_eq!(config.worker.trade_timeout(), Duration::from_secs(5));
        assert_eq!(config.directory.url, "http://127.0.0.1:7070");
        assert_eq!(config.watch.to_watch_config(), WatchConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "
worker:
  kingdom: north
  town: riverbend
  pass_pause_ms: 250
watch:
  fade_window_ms: 2000
";
        let config = CivConfig::parse(yaml).unwrap();
        assert_eq!(config.worker.kingdom, "north");
        assert_eq!(config.worker.town, "riverbend");
        assert_eq!(config.worker.pass_pause(), Duration::from_millis(250));
        assert_eq!(config.worker.trade_timeout_ms, 5000);
        assert_eq!(config.watch.tick_ms, 200);
        assert_eq!(
            config.watch.to_watch_config().fade_window,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = CivConfig::parse("worker: [1, 2");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = CivConfig::load(Path::new("/nonexistent/civ-config.yaml")).unwrap();
        assert_eq!(config.directory, DirectorySettings::default());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let env: BTreeMap<&str, &str> = [
            ("CIV_KINGDOM", "south"),
            ("HOSTNAME", "mill-7f9c"),
            ("CIV_DIRECTORY_URL", "http://directory:7070"),
        ]
        .into_iter()
        .collect();
        let mut config = CivConfig::parse("worker:\n  kingdom: north\n").unwrap();
        config.apply_env_overrides(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config.worker.kingdom, "south");
        assert_eq!(config.worker.name, "mill-7f9c");
        assert_eq!(config.directory.url, "http://directory:7070");
        assert_eq!(config.worker.town, "");
    }

    #[test]
    fn explicit_worker_name_beats_hostname() {
        let mut config = CivConfig::default();
        config.apply_env_overrides(|key| match key {
            "CIV_WORKER_NAME" => Some(String::from("mill-0")),
            "HOSTNAME" => Some(String::from("mill-7f9c")),
            _ => None,
        });
        assert_eq!(config.worker.require_name().unwrap(), "mill-0");
    }

    #[test]
    fn unset_name_and_bad_address_are_rejected() {
        let mut config = CivConfig::default();
        assert!(matches!(
            config.worker.require_name(),
            Err(ConfigError::Invalid { field: "worker.name", .. })
        ));

        config.worker.listen_addr = String::from("not-an-address");
        assert!(config.worker.listen_addr().is_err());
        assert!(config.directory.listen_addr().is_ok());
    }
}
