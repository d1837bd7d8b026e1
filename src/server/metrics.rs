use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all service metrics
const PREFIX: &str = "geo_notify";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Location check Metrics
    pub static ref LOCATION_CHECKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_location_checks_total"), "Location checks by outcome"),
        &["outcome"]
    ).expect("Failed to create location_checks_total metric");

    // Webhook Metrics
    pub static ref WEBHOOK_ENQUEUE_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_webhook_enqueue_total"), "Webhook jobs enqueued by result"),
        &["result"]
    ).expect("Failed to create webhook_enqueue_total metric");

    pub static ref WEBHOOK_DELIVERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_webhook_deliveries_total"),
            "Webhook delivery attempts by outcome"
        ),
        &["outcome"]
    ).expect("Failed to create webhook_deliveries_total metric");

    pub static ref WEBHOOK_DELIVERY_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_webhook_delivery_duration_seconds"),
            "Webhook delivery attempt duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0])
    ).expect("Failed to create webhook_delivery_duration_seconds metric");

    pub static ref WEBHOOK_PENDING_RETRIES: Gauge = Gauge::new(
        format!("{PREFIX}_webhook_pending_retries"),
        "Retries waiting in the scheduler"
    ).expect("Failed to create webhook_pending_retries metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type and endpoint"),
        &["error_type", "endpoint"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LOCATION_CHECKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WEBHOOK_ENQUEUE_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WEBHOOK_DELIVERIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WEBHOOK_DELIVERY_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(WEBHOOK_PENDING_RETRIES.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// `outcome` is one of "danger", "safe", "invalid", "error".
pub fn record_location_check(outcome: &str) {
    LOCATION_CHECKS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_webhook_enqueue(result: &str) {
    WEBHOOK_ENQUEUE_TOTAL.with_label_values(&[result]).inc();
}

/// `outcome` is one of "delivered", "retry_scheduled", "permanently_failed".
pub fn record_webhook_delivery(outcome: &str, duration: Duration) {
    WEBHOOK_DELIVERIES_TOTAL.with_label_values(&[outcome]).inc();
    WEBHOOK_DELIVERY_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn set_pending_retries(count: usize) {
    WEBHOOK_PENDING_RETRIES.set(count as f64);
}

pub fn record_error(error_type: &str, endpoint: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, endpoint])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
