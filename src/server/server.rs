use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::health::health;
use super::incident_routes::make_incident_routes;
use super::location_routes::make_location_routes;
use super::{log_requests, metrics, state::ServerState};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

pub fn make_app(state: ServerState) -> Result<Router> {
    let system_routes: Router = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    let app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/api/v1/location", make_location_routes(state.clone()))
        .nest("/api/v1/incidents", make_incident_routes(state.clone()))
        .nest("/api/v1/system", system_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown_token` fires.
pub async fn run_server(state: ServerState, shutdown_token: CancellationToken) -> Result<()> {
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;
    let app = make_app(state)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Listening on port {}, metrics on port {}", port, metrics_port);

    let api_token = shutdown_token.clone();
    let api = axum::serve(listener, app)
        .with_graceful_shutdown(async move { api_token.cancelled().await });
    let metrics_server = axum::serve(metrics_listener, make_metrics_app())
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await });

    tokio::try_join!(api, metrics_server)?;
    Ok(())
}

/// Fires `shutdown_token` and gives `server` up to `timeout` to finish in-flight requests.
pub async fn drain_server<F>(
    server: F,
    shutdown_token: &CancellationToken,
    timeout: Duration,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    shutdown_token.cancel();
    match tokio::time::timeout(timeout, server).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "HTTP server did not drain within {:?}, dropping open connections",
                timeout
            );
            Ok(())
        }
    }
}
