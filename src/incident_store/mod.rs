mod active_cache;
mod models;
mod schema;
mod sqlite_incident_store;

pub use active_cache::{ActiveIncidentCache, ACTIVE_INCIDENTS_TTL};
pub use models::{Incident, IncidentInput};
pub use sqlite_incident_store::SqliteIncidentStore;

use crate::geo::Geofence;
use anyhow::Result;

/// Read side consumed by the location check path. Always reads live data.
pub trait GeofenceSource: Send + Sync {
    fn list_active(&self) -> Result<Vec<Geofence>>;
}

pub trait IncidentStore: GeofenceSource {
    fn create_incident(&self, input: &IncidentInput) -> Result<Incident>;

    fn get_incident(&self, id: i64) -> Result<Option<Incident>>;

    /// Newest first.
    fn list_incidents(&self, limit: usize, offset: usize) -> Result<Vec<Incident>>;

    fn list_active_incidents(&self) -> Result<Vec<Incident>>;

    /// Returns `None` if no incident has this id.
    fn update_incident(&self, id: i64, input: &IncidentInput) -> Result<Option<Incident>>;

    /// Soft delete. Returns false when the incident is missing or already inactive.
    fn deactivate_incident(&self, id: i64) -> Result<bool>;

    fn ping(&self) -> Result<()>;
}
