//! CLI configuration
//!
//! Layered as defaults, then an optional `peerza.toml`, then `PEERZA_*`
//! environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use peerza_http::client::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "peerza.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the Peerza API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds (0 = transport default)
    #[serde(default)]
    pub timeout_secs: u64,
    /// Where credentials are kept; defaults to the platform data directory
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Log level used when neither `RUST_LOG` nor `--log-level` is given
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_chat_poll_secs")]
    pub chat_poll_secs: u64,
    #[serde(default = "default_notification_poll_secs")]
    pub notification_poll_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_chat_poll_secs() -> u64 {
    3
}

fn default_notification_poll_secs() -> u64 {
    8
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: 0,
            session_file: None,
            log_level: default_log_level(),
            chat_poll_secs: default_chat_poll_secs(),
            notification_poll_secs: default_notification_poll_secs(),
        }
    }
}

impl CliConfig {
    /// Load configuration, reading `path` if given or searching the usual places
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                for candidate in config_candidates() {
                    if candidate.exists() {
                        builder = builder.add_source(File::from(candidate).required(false));
                    }
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("PEERZA").try_parsing(true));

        let config = builder.build().context("failed to load configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn chat_poll_interval(&self) -> Duration {
        Duration::from_secs(self.chat_poll_secs.max(1))
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_secs.max(1))
    }
}

fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from(CONFIG_FILE),
        PathBuf::from("config").join(CONFIG_FILE),
    ];
    if let Some(dirs) = ProjectDirs::from("app", "Peerza", "peerza") {
        candidates.push(dirs.config_dir().join(CONFIG_FILE));
    }
    candidates
}
