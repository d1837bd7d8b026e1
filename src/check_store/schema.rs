use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const LOCATION_CHECKS_TABLE_V0: Table = Table {
    name: "location_checks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("lat", &SqlType::Real, non_null = true),
        sqlite_column!("lon", &SqlType::Real, non_null = true),
        sqlite_column!("danger_detected", &SqlType::Integer, non_null = true),
        sqlite_column!("checked_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_checks_danger_time", "danger_detected, checked_at"),
        ("idx_checks_user", "user_id"),
    ],
};

pub const CHECKS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[LOCATION_CHECKS_TABLE_V0],
    migration: None,
}];
