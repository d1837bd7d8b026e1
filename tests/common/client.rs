//! HTTP client wrapper for the service's endpoints

use super::constants::OPERATOR_API_KEY;
use reqwest::{Client, Response};
use serde_json::{json, Value};

pub struct TestClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TestClient {
    /// Client without operator credentials
    pub fn anonymous(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: None,
        }
    }

    pub fn operator(base_url: String) -> Self {
        Self {
            api_key: Some(OPERATOR_API_KEY.to_string()),
            ..Self::anonymous(base_url)
        }
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    pub async fn check_location(&self, user_id: i64, lat: f64, lon: f64) -> Response {
        self.client
            .post(format!("{}/api/v1/location/check", self.base_url))
            .json(&json!({ "user_id": user_id, "lat": lat, "lon": lon }))
            .send()
            .await
            .expect("Location check request failed")
    }

    pub async fn check_location_raw(&self, body: &str) -> Response {
        self.client
            .post(format!("{}/api/v1/location/check", self.base_url))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Location check request failed")
    }

    pub async fn create_incident(&self, body: &Value) -> Response {
        self.with_key(
            self.client
                .post(format!("{}/api/v1/incidents", self.base_url))
                .json(body),
        )
        .send()
        .await
        .expect("Create incident request failed")
    }

    /// Creates an incident and returns its id. Panics unless the server answers 201.
    pub async fn create_incident_at(
        &self,
        category: &str,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> i64 {
        let response = self
            .create_incident(&json!({
                "category": category,
                "latitude": latitude,
                "longitude": longitude,
                "radius_meters": radius_meters,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().expect("Created incident has no id")
    }

    pub async fn list_incidents(&self, query: &str) -> Response {
        self.with_key(
            self.client
                .get(format!("{}/api/v1/incidents{}", self.base_url, query)),
        )
        .send()
        .await
        .expect("List incidents request failed")
    }

    pub async fn get_incident(&self, id: i64) -> Response {
        self.with_key(
            self.client
                .get(format!("{}/api/v1/incidents/{}", self.base_url, id)),
        )
        .send()
        .await
        .expect("Get incident request failed")
    }

    pub async fn update_incident(&self, id: i64, body: &Value) -> Response {
        self.with_key(
            self.client
                .put(format!("{}/api/v1/incidents/{}", self.base_url, id))
                .json(body),
        )
        .send()
        .await
        .expect("Update incident request failed")
    }

    pub async fn delete_incident(&self, id: i64) -> Response {
        self.with_key(
            self.client
                .delete(format!("{}/api/v1/incidents/{}", self.base_url, id)),
        )
        .send()
        .await
        .expect("Delete incident request failed")
    }

    pub async fn get_stats(&self) -> Response {
        self.with_key(
            self.client
                .get(format!("{}/api/v1/incidents/stats", self.base_url)),
        )
        .send()
        .await
        .expect("Stats request failed")
    }

    pub async fn get_health(&self) -> Response {
        self.client
            .get(format!("{}/api/v1/system/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }
}
