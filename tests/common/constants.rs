pub const OPERATOR_API_KEY: &str = "test-operator-key";

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Retry delay step used by test servers, so retry chains finish quickly.
pub const TEST_RETRY_DELAY_STEP_MS: u64 = 20;

pub const DELIVERY_WAIT_TIMEOUT_MS: u64 = 5000;

// Red Square, Moscow
pub const FIRE_LAT: f64 = 55.7539;
pub const FIRE_LON: f64 = 37.6208;
pub const FIRE_RADIUS_METERS: f64 = 300.0;
