use crate::geo::{Coordinates, Geofence};
use serde::{Deserialize, Serialize};

/// A danger zone as managed by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Incident {
    pub fn to_geofence(&self) -> Geofence {
        Geofence {
            id: self.id,
            category: self.category.clone(),
            center: Coordinates::new(self.latitude, self.longitude),
            radius_meters: self.radius_meters,
            active: self.active,
        }
    }
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentInput {
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    /// Defaults to true on create; left unchanged on update when absent.
    #[serde(default)]
    pub active: Option<bool>,
}

impl IncidentInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        if !Coordinates::new(self.latitude, self.longitude).is_valid() {
            return Err("latitude must be in [-90, 90] and longitude in [-180, 180]".to_string());
        }
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err("radius_meters must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> IncidentInput {
        IncidentInput {
            category: "fire".to_string(),
            description: "warehouse fire".to_string(),
            latitude: 55.7512,
            longitude: 37.6184,
            radius_meters: 100.0,
            active: None,
        }
    }

    #[test]
    fn accepts_valid_input() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_radius() {
        let mut input = valid_input();
        input.radius_meters = 0.0;
        assert!(input.validate().unwrap_err().contains("radius_meters"));
        input.radius_meters = -5.0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut input = valid_input();
        input.latitude = 90.5;
        assert!(input.validate().is_err());

        let mut input = valid_input();
        input.longitude = -180.1;
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_blank_category() {
        let mut input = valid_input();
        input.category = "  ".to_string();
        assert!(input.validate().unwrap_err().contains("category"));
    }

    #[test]
    fn description_and_active_are_optional_in_json() {
        let input: IncidentInput = serde_json::from_str(
            r#"{"category":"flood","latitude":1.0,"longitude":2.0,"radius_meters":50.0}"#,
        )
        .unwrap();
        assert_eq!(input.description, "");
        assert_eq!(input.active, None);
    }
}
