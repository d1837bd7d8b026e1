//! Geofence danger detection with asynchronous webhook notifications.

pub mod check_store;
pub mod config;
pub mod geo;
pub mod incident_store;
pub mod location;
pub mod server;
pub mod sqlite_persistence;
pub mod webhook;
