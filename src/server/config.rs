use super::RequestsLoggingLevel;
use crate::config::DEFAULT_STATS_WINDOW_MINUTES;
use std::time::Duration;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    /// Value the `X-API-Key` header must carry on incident routes.
    pub operator_api_key: String,
    pub stats_window_minutes: u64,
}

impl ServerConfig {
    pub fn stats_window(&self) -> Duration {
        Duration::from_secs(self.stats_window_minutes * 60)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 8080,
            metrics_port: 9091,
            operator_api_key: String::new(),
            stats_window_minutes: DEFAULT_STATS_WINDOW_MINUTES,
        }
    }
}
