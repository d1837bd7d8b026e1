use super::models::LocationCheck;
use super::schema::CHECKS_VERSIONED_SCHEMAS;
use super::CheckRecorder;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct SqliteCheckStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), CHECKS_VERSIONED_SCHEMAS, "checks")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        CHECKS_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn count_danger_users_after(&self, cutoff: i64) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM location_checks
             WHERE danger_detected = 1 AND checked_at >= ?1",
            params![cutoff],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl CheckRecorder for SqliteCheckStore {
    fn record(&self, check: &LocationCheck) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO location_checks (user_id, lat, lon, danger_detected, checked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                check.user_id,
                check.lat,
                check.lon,
                check.danger_detected,
                check.timestamp.timestamp()
            ],
        )
        .context("Failed to record location check")?;
        Ok(())
    }

    fn count_danger_users_since(&self, window: Duration) -> Result<u64> {
        let cutoff = chrono::Utc::now().timestamp() - window.as_secs() as i64;
        self.count_danger_users_after(cutoff)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .context("Checks database unreachable")
    }
}
