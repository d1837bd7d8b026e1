mod models;
mod schema;
mod sqlite_check_store;

pub use models::LocationCheck;
pub use sqlite_check_store::SqliteCheckStore;

use anyhow::Result;
use std::time::Duration;

/// Durable log of location checks.
pub trait CheckRecorder: Send + Sync {
    /// Must not return before the check is persisted.
    fn record(&self, check: &LocationCheck) -> Result<()>;

    /// Distinct users with at least one dangerous check in the trailing `window`.
    fn count_danger_users_since(&self, window: Duration) -> Result<u64>;

    fn ping(&self) -> Result<()>;
}
