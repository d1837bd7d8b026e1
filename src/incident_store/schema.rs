use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

const INCIDENTS_TABLE_V0: Table = Table {
    name: "incidents",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("latitude", &SqlType::Real, non_null = true),
        sqlite_column!("longitude", &SqlType::Real, non_null = true),
        sqlite_column!("radius_meters", &SqlType::Real, non_null = true),
        sqlite_column!("active", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_incidents_active", "active")],
};

pub const INCIDENTS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[INCIDENTS_TABLE_V0],
    migration: None,
}];
