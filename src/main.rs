use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use geo_notification_server::check_store::SqliteCheckStore;
use geo_notification_server::config::{self, DEFAULT_STATS_WINDOW_MINUTES};
use geo_notification_server::incident_store::SqliteIncidentStore;
use geo_notification_server::location::LocationService;
use geo_notification_server::server::{
    drain_server, metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState,
};
use geo_notification_server::webhook::{
    DeliveryWorker, HttpWebhookSender, NotificationProducer, RetryPolicy, RetryScheduler,
    SqliteWebhookQueue, DEFAULT_MAX_RETRIES, DEFAULT_WEBHOOK_TIMEOUT,
};

/// Upper bound on waiting for in-flight HTTP requests after Ctrl+C.
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding incidents.db, checks.db and webhook_queue.db.
    #[clap(long, env = "DB_DIR", value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, env = "METRICS_PORT", default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Endpoint receiving danger notifications.
    #[clap(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Key required in the X-API-Key header of incident management requests.
    #[clap(long, env = "OPERATOR_API_KEY", hide_env_values = true)]
    pub operator_api_key: Option<String>,

    /// Trailing window for the incident stats endpoint.
    #[clap(long, env = "STATS_TIME_WINDOW_MINUTES", default_value_t = DEFAULT_STATS_WINDOW_MINUTES)]
    pub stats_window_minutes: u64,

    /// Retries allowed after the first failed webhook delivery.
    #[clap(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub webhook_max_retries: u32,

    /// Timeout in seconds for a single webhook delivery attempt.
    #[clap(long, default_value_t = DEFAULT_WEBHOOK_TIMEOUT.as_secs())]
    pub webhook_timeout_sec: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            webhook_url: args.webhook_url.clone(),
            operator_api_key: args.operator_api_key.clone(),
            stats_window_minutes: args.stats_window_minutes,
            webhook_max_retries: args.webhook_max_retries,
            webhook_timeout_sec: args.webhook_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  webhook url: {}", app_config.webhook.url);
    info!("  webhook max retries: {}", app_config.webhook.max_retries);
    info!("  stats window: {} minutes", app_config.stats_window_minutes);

    info!("Initializing metrics...");
    metrics::init_metrics();

    let incident_store = Arc::new(SqliteIncidentStore::new(app_config.incidents_db_path())?);
    let check_store = Arc::new(SqliteCheckStore::new(app_config.checks_db_path())?);
    let webhook_queue = Arc::new(SqliteWebhookQueue::new(
        app_config.webhook_queue_db_path(),
    )?);

    let shutdown_token = CancellationToken::new();

    let (retry_scheduler, retry_handle) =
        RetryScheduler::new(webhook_queue.clone(), shutdown_token.child_token());
    let sender =
        HttpWebhookSender::new(app_config.webhook.url.clone(), app_config.webhook.timeout)?;
    let worker = DeliveryWorker::new(
        webhook_queue.clone(),
        Arc::new(sender),
        Arc::new(retry_handle),
        RetryPolicy::new(app_config.webhook.max_retries),
    );

    let scheduler_task = tokio::spawn(retry_scheduler.run());
    let worker_token = shutdown_token.child_token();
    let worker_task = tokio::spawn(async move { worker.run(worker_token).await });

    let location_service = LocationService::new(
        incident_store.clone(),
        check_store.clone(),
        NotificationProducer::new(webhook_queue.clone()),
    );

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        operator_api_key: app_config.operator_api_key.clone(),
        stats_window_minutes: app_config.stats_window_minutes,
    };
    let state = ServerState::new(
        server_config,
        Arc::new(location_service),
        incident_store,
        check_store,
        webhook_queue,
    );

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    let server = run_server(state, shutdown_token.clone());
    tokio::pin!(server);

    let stopped = tokio::select! {
        result = &mut server => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let result = match stopped {
        Some(result) => {
            info!("HTTP server stopped: {:?}", result);
            result
        }
        None => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            drain_server(&mut server, &shutdown_token, SERVER_DRAIN_TIMEOUT).await
        }
    };

    shutdown_token.cancel();
    // The worker finishes its in-flight delivery before exiting
    let (worker_result, scheduler_result) = tokio::join!(worker_task, scheduler_task);
    if let Err(e) = worker_result {
        error!("Webhook delivery worker task failed: {}", e);
    }
    if let Err(e) = scheduler_result {
        error!("Retry scheduler task failed: {}", e);
    }

    info!("Shutdown complete");
    result
}
