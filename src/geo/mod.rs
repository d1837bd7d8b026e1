//! Point-in-geofence matching on the WGS-84 ellipsoid.

mod distance;
mod matcher;

pub use distance::{geodesic_distance_meters, haversine_distance_meters};
pub use matcher::match_point;

use serde::{Deserialize, Serialize};

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A circular danger zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Geofence {
    pub id: i64,
    pub category: String,
    pub center: Coordinates,
    pub radius_meters: f64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyMatch {
    pub geofence_id: i64,
    pub category: String,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchResult {
    pub danger: bool,
    /// Closest first, ties broken by geofence id.
    pub matches: Vec<NearbyMatch>,
}
