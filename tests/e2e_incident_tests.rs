//! End-to-end tests for the operator incident endpoints

mod common;

use common::{TestClient, TestServer, WebhookReceiver, FIRE_LAT, FIRE_LON, FIRE_RADIUS_METERS};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn spawn() -> (WebhookReceiver, TestServer) {
    let receiver = WebhookReceiver::spawn(0).await;
    let server = TestServer::spawn(&receiver.url, 5).await;
    (receiver, server)
}

#[tokio::test]
async fn test_requests_without_api_key_are_unauthorized() {
    let (_receiver, server) = spawn().await;
    let client = TestClient::anonymous(server.base_url.clone());

    let response = client.list_incidents("").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"], "missing API key");

    let response = client
        .create_incident(&json!({
            "category": "fire",
            "latitude": 1.0,
            "longitude": 1.0,
            "radius_meters": 10.0,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(client.get_stats().await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_get_incident() {
    let (_receiver, server) = spawn().await;
    let operator = TestClient::operator(server.base_url.clone());

    let response = operator
        .create_incident(&json!({
            "category": "fire",
            "description": "Warehouse fire",
            "latitude": FIRE_LAT,
            "longitude": FIRE_LON,
            "radius_meters": FIRE_RADIUS_METERS,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["active"], Value::Bool(true));
    let id = created["id"].as_i64().unwrap();

    let response = operator.get_incident(id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched["description"], "Warehouse fire");
    assert_eq!(fetched["radius_meters"].as_f64(), Some(FIRE_RADIUS_METERS));

    assert_eq!(
        operator.get_incident(id + 100).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_create_rejects_invalid_incident() {
    let (_receiver, server) = spawn().await;
    let operator = TestClient::operator(server.base_url.clone());

    let invalid = [
        json!({"category": "fire", "latitude": 1.0, "longitude": 1.0, "radius_meters": 0.0}),
        json!({"category": "", "latitude": 1.0, "longitude": 1.0, "radius_meters": 10.0}),
        json!({"category": "fire", "latitude": 95.0, "longitude": 1.0, "radius_meters": 10.0}),
        json!({"category": "fire", "latitude": 1.0}),
    ];
    for body in invalid.iter() {
        let response = operator.create_incident(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn test_list_paginates_newest_first() {
    let (_receiver, server) = spawn().await;
    let operator = TestClient::operator(server.base_url.clone());

    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(
            operator
                .create_incident_at(&format!("cat-{}", i), 1.0, 1.0 + i as f64, 10.0)
                .await,
        );
    }

    let response = operator.list_incidents("?limit=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Vec<Value> = response.json().await.unwrap();
    let page_ids: Vec<i64> = page.iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(page_ids, vec![ids[2], ids[1]]);

    let response = operator.list_incidents("?limit=2&offset=2").await;
    let page: Vec<Value> = response.json().await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["id"].as_i64(), Some(ids[0]));
}

#[tokio::test]
async fn test_update_moves_the_geofence() {
    let (_receiver, server) = spawn().await;
    let operator = TestClient::operator(server.base_url.clone());
    let client = TestClient::anonymous(server.base_url.clone());

    let id = operator.create_incident_at("gas", 0.0, 0.0, 50.0).await;

    let response = operator
        .update_incident(
            id,
            &json!({"category": "gas", "latitude": 20.0, "longitude": 20.0, "radius_meters": 50.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = client.check_location(1, 0.0, 0.0).await.json().await.unwrap();
    assert_eq!(body["danger"], Value::Bool(false));
    let body: Value = client.check_location(1, 20.0, 20.0).await.json().await.unwrap();
    assert_eq!(body["danger"], Value::Bool(true));

    let response = operator
        .update_incident(
            id + 100,
            &json!({"category": "gas", "latitude": 1.0, "longitude": 1.0, "radius_meters": 50.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deactivated_incident_no_longer_matches() {
    let (_receiver, server) = spawn().await;
    let operator = TestClient::operator(server.base_url.clone());
    let client = TestClient::anonymous(server.base_url.clone());

    let id = operator
        .create_incident_at("fire", FIRE_LAT, FIRE_LON, FIRE_RADIUS_METERS)
        .await;
    let body: Value = client
        .check_location(3, FIRE_LAT, FIRE_LON)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["danger"], Value::Bool(true));

    let active: Vec<Value> = operator
        .list_incidents("?active=true")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    assert_eq!(operator.delete_incident(id).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(operator.delete_incident(id).await.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .check_location(3, FIRE_LAT, FIRE_LON)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["danger"], Value::Bool(false));

    // Soft delete keeps the row around
    let fetched: Value = operator.get_incident(id).await.json().await.unwrap();
    assert_eq!(fetched["active"], Value::Bool(false));

    let active: Vec<Value> = operator
        .list_incidents("?active=true")
        .await
        .json()
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_stats_count_distinct_users_in_danger() {
    let (_receiver, server) = spawn().await;
    let operator = TestClient::operator(server.base_url.clone());
    let client = TestClient::anonymous(server.base_url.clone());

    operator
        .create_incident_at("fire", FIRE_LAT, FIRE_LON, FIRE_RADIUS_METERS)
        .await;

    client.check_location(1, FIRE_LAT, FIRE_LON).await;
    client.check_location(1, FIRE_LAT, FIRE_LON).await;
    client.check_location(2, FIRE_LAT, FIRE_LON).await;
    // Safe check, not counted
    client.check_location(3, 0.0, 0.0).await;

    let response = operator.get_stats().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_count"], 2);
    assert_eq!(body["window_minutes"], 60);
}
