use super::models::{Incident, IncidentInput};
use super::schema::INCIDENTS_VERSIONED_SCHEMAS;
use super::{GeofenceSource, IncidentStore};
use crate::geo::Geofence;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const INCIDENT_COLUMNS: &str =
    "id, category, description, latitude, longitude, radius_meters, active, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteIncidentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIncidentStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), INCIDENTS_VERSIONED_SCHEMAS, "incidents")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        INCIDENTS_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_incident(row: &rusqlite::Row) -> rusqlite::Result<Incident> {
        Ok(Incident {
            id: row.get("id")?,
            category: row.get("category")?,
            description: row.get("description")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            radius_meters: row.get("radius_meters")?,
            active: row.get::<_, i32>("active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn query_active(conn: &Connection) -> Result<Vec<Incident>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM incidents WHERE active = 1 ORDER BY id",
            INCIDENT_COLUMNS
        ))?;
        let incidents = stmt
            .query_map([], Self::row_to_incident)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(incidents)
    }

    fn query_by_id(conn: &Connection, id: i64) -> Result<Option<Incident>> {
        let incident = conn
            .query_row(
                &format!("SELECT {} FROM incidents WHERE id = ?1", INCIDENT_COLUMNS),
                params![id],
                Self::row_to_incident,
            )
            .optional()?;
        Ok(incident)
    }
}

impl GeofenceSource for SqliteIncidentStore {
    fn list_active(&self) -> Result<Vec<Geofence>> {
        let conn = self.conn.lock().unwrap();
        let incidents = Self::query_active(&conn).context("Failed to list active geofences")?;
        Ok(incidents.iter().map(Incident::to_geofence).collect())
    }
}

impl IncidentStore for SqliteIncidentStore {
    fn create_incident(&self, input: &IncidentInput) -> Result<Incident> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO incidents (category, description, latitude, longitude, radius_meters, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                input.category,
                input.description,
                input.latitude,
                input.longitude,
                input.radius_meters,
                input.active.unwrap_or(true),
                now,
            ],
        )
        .context("Failed to insert incident")?;
        let id = conn.last_insert_rowid();
        Self::query_by_id(&conn, id)?.context("Inserted incident not found")
    }

    fn get_incident(&self, id: i64) -> Result<Option<Incident>> {
        let conn = self.conn.lock().unwrap();
        Self::query_by_id(&conn, id)
    }

    fn list_incidents(&self, limit: usize, offset: usize) -> Result<Vec<Incident>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM incidents ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            INCIDENT_COLUMNS
        ))?;
        let incidents = stmt
            .query_map(params![limit as i64, offset as i64], Self::row_to_incident)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(incidents)
    }

    fn list_active_incidents(&self) -> Result<Vec<Incident>> {
        let conn = self.conn.lock().unwrap();
        Self::query_active(&conn)
    }

    fn update_incident(&self, id: i64, input: &IncidentInput) -> Result<Option<Incident>> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();
        let updated = conn
            .execute(
                "UPDATE incidents
                 SET category = ?1, description = ?2, latitude = ?3, longitude = ?4,
                     radius_meters = ?5, active = COALESCE(?6, active), updated_at = ?7
                 WHERE id = ?8",
                params![
                    input.category,
                    input.description,
                    input.latitude,
                    input.longitude,
                    input.radius_meters,
                    input.active,
                    now,
                    id,
                ],
            )
            .context("Failed to update incident")?;
        if updated == 0 {
            return Ok(None);
        }
        Self::query_by_id(&conn, id)
    }

    fn deactivate_incident(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();
        let updated = conn
            .execute(
                "UPDATE incidents SET active = 0, updated_at = ?1 WHERE id = ?2 AND active = 1",
                params![now, id],
            )
            .context("Failed to deactivate incident")?;
        Ok(updated > 0)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .context("Incidents database unreachable")
    }
}
