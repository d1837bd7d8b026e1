mod file_config;

pub use file_config::{FileConfig, WebhookConfig};

use crate::server::RequestsLoggingLevel;
use crate::webhook::{DEFAULT_MAX_RETRIES, DEFAULT_WEBHOOK_TIMEOUT};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STATS_WINDOW_MINUTES: u64 = 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub webhook_url: Option<String>,
    pub operator_api_key: Option<String>,
    pub stats_window_minutes: u64,
    pub webhook_max_retries: u32,
    pub webhook_timeout_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 8080,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::default(),
            webhook_url: None,
            operator_api_key: None,
            stats_window_minutes: DEFAULT_STATS_WINDOW_MINUTES,
            webhook_max_retries: DEFAULT_MAX_RETRIES,
            webhook_timeout_sec: DEFAULT_WEBHOOK_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub operator_api_key: String,
    pub stats_window_minutes: u64,
    pub webhook: WebhookSettings,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let operator_api_key = file
            .operator_api_key
            .or_else(|| cli.operator_api_key.clone())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "operator_api_key must be specified via --operator-api-key or in config file"
                )
            })?;

        let stats_window_minutes = file
            .stats_window_minutes
            .unwrap_or(cli.stats_window_minutes);
        if stats_window_minutes == 0 {
            bail!("stats_window_minutes must be greater than 0");
        }

        let webhook_file = file.webhook.unwrap_or_default();
        let webhook_url = webhook_file
            .url
            .or_else(|| cli.webhook_url.clone())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("webhook url must be specified via --webhook-url or in config file")
            })?;
        if !(webhook_url.starts_with("http://") || webhook_url.starts_with("https://")) {
            bail!("webhook url must be an http(s) URL: {}", webhook_url);
        }

        let timeout_sec = webhook_file.timeout_sec.unwrap_or(cli.webhook_timeout_sec);
        if timeout_sec == 0 {
            bail!("webhook timeout must be greater than 0 seconds");
        }

        let webhook = WebhookSettings {
            url: webhook_url,
            max_retries: webhook_file.max_retries.unwrap_or(cli.webhook_max_retries),
            timeout: Duration::from_secs(timeout_sec),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            operator_api_key,
            stats_window_minutes,
            webhook,
        })
    }

    pub fn stats_window(&self) -> Duration {
        Duration::from_secs(self.stats_window_minutes * 60)
    }

    pub fn incidents_db_path(&self) -> PathBuf {
        self.db_dir.join("incidents.db")
    }

    pub fn checks_db_path(&self) -> PathBuf {
        self.db_dir.join("checks.db")
    }

    pub fn webhook_queue_db_path(&self) -> PathBuf {
        self.db_dir.join("webhook_queue.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
