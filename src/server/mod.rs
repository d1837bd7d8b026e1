mod api_error;
pub mod config;
mod health;
mod http_layers;
mod incident_routes;
mod location_routes;
pub mod metrics;
pub mod server;
pub mod state;

pub use api_error::{error_response, ErrorBody};
pub use config::ServerConfig;
pub use health::{check_health, HealthResponse, HealthStatus};
pub use http_layers::*;
pub use incident_routes::IncidentStats;
pub use server::{drain_server, make_app, make_metrics_app, run_server};
pub use state::ServerState;
