use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub operator_api_key: Option<String>,
    pub stats_window_minutes: Option<u64>,

    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
db_dir = "/data"
port = 8080
metrics_port = 9100
logging_level = "headers"
operator_api_key = "secret"
stats_window_minutes = 15

[webhook]
url = "http://hooks.local/danger"
max_retries = 3
timeout_sec = 2
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(config.db_dir.as_deref(), Some("/data"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.metrics_port, Some(9100));
        assert_eq!(config.logging_level.as_deref(), Some("headers"));
        assert_eq!(config.operator_api_key.as_deref(), Some("secret"));
        assert_eq!(config.stats_window_minutes, Some(15));
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.url.as_deref(), Some("http://hooks.local/danger"));
        assert_eq!(webhook.max_retries, Some(3));
        assert_eq!(webhook.timeout_sec, Some(2));
    }

    #[test]
    fn test_load_empty_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = FileConfig::load(file.path()).unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.webhook.is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
