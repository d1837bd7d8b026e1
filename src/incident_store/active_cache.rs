//! In-process read-through cache for the active incidents listing.

use super::Incident;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const ACTIVE_INCIDENTS_TTL: Duration = Duration::from_secs(30);

struct CachedEntry {
    stored_at: Instant,
    incidents: Vec<Incident>,
}

pub struct ActiveIncidentCache {
    ttl: Duration,
    entry: Mutex<Option<CachedEntry>>,
}

impl ActiveIncidentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Returns the cached list unless it is missing or older than the TTL.
    pub fn get(&self) -> Option<Vec<Incident>> {
        let entry = self.entry.lock().unwrap();
        entry
            .as_ref()
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.incidents.clone())
    }

    pub fn set(&self, incidents: Vec<Incident>) {
        *self.entry.lock().unwrap() = Some(CachedEntry {
            stored_at: Instant::now(),
            incidents,
        });
    }

    pub fn invalidate(&self) {
        *self.entry.lock().unwrap() = None;
    }
}

impl Default for ActiveIncidentCache {
    fn default() -> Self {
        Self::new(ACTIVE_INCIDENTS_TTL)
    }
}
