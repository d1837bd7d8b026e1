//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases and delivery
//! pipeline pointed at the given webhook URL.

use super::constants::*;
use geo_notification_server::check_store::SqliteCheckStore;
use geo_notification_server::incident_store::SqliteIncidentStore;
use geo_notification_server::location::LocationService;
use geo_notification_server::server::{
    make_app, RequestsLoggingLevel, ServerConfig, ServerState,
};
use geo_notification_server::webhook::{
    DeliveryWorker, HttpWebhookSender, NotificationProducer, RetryPolicy, RetryScheduler,
    SqliteWebhookQueue, WebhookQueue,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// When dropped, the server and its background tasks shut down and temp
/// resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Queue handle for inspecting pending jobs directly
    pub webhook_queue: Arc<dyn WebhookQueue>,

    _temp_db_dir: TempDir,
    shutdown_token: CancellationToken,
}

impl TestServer {
    pub async fn spawn(webhook_url: &str, max_retries: u32) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");

        let incident_store = Arc::new(
            SqliteIncidentStore::new(temp_db_dir.path().join("incidents.db"))
                .expect("Failed to open incident store"),
        );
        let check_store = Arc::new(
            SqliteCheckStore::new(temp_db_dir.path().join("checks.db"))
                .expect("Failed to open check store"),
        );
        let webhook_queue = Arc::new(
            SqliteWebhookQueue::new(temp_db_dir.path().join("webhook_queue.db"))
                .expect("Failed to open webhook queue"),
        );

        let shutdown_token = CancellationToken::new();

        let (scheduler, retry_handle) =
            RetryScheduler::new(webhook_queue.clone(), shutdown_token.clone());
        let sender = HttpWebhookSender::new(webhook_url.to_string(), Duration::from_secs(2))
            .expect("Failed to build webhook sender");
        let policy = RetryPolicy {
            max_retries,
            delay_step: Duration::from_millis(TEST_RETRY_DELAY_STEP_MS),
        };
        let worker = DeliveryWorker::new(
            webhook_queue.clone(),
            Arc::new(sender),
            Arc::new(retry_handle),
            policy,
        );
        tokio::spawn(scheduler.run());
        let worker_token = shutdown_token.clone();
        tokio::spawn(async move { worker.run(worker_token).await });

        let location_service = LocationService::new(
            incident_store.clone(),
            check_store.clone(),
            NotificationProducer::new(webhook_queue.clone()),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
            operator_api_key: OPERATOR_API_KEY.to_string(),
            ..ServerConfig::default()
        };
        let state = ServerState::new(
            config,
            Arc::new(location_service),
            incident_store,
            check_store,
            webhook_queue.clone(),
        );
        let app = make_app(state).expect("Failed to build app");

        let server_token = shutdown_token.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_token.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            webhook_queue,
            _temp_db_dir: temp_db_dir,
            shutdown_token,
        };
        server.wait_for_ready().await;
        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
