use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use voter_rides::api::rest::router;
use voter_rides::auth::AuthMode;
use voter_rides::config::Config;
use voter_rides::state::AppState;

const RIDER_TOKEN: &str = "rider-token";
const DRIVER_TOKEN: &str = "driver-token";

fn test_config() -> Config {
    Config {
        http_port: 0,
        log_level: "info".to_string(),
        auth_mode: AuthMode::Test,
        geocoding_api_key: String::new(),
        civic_api_key: String::new(),
        geocoding_base_url: "http://localhost/geocode".to_string(),
        civic_base_url: "http://localhost/voterinfo".to_string(),
    }
}

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(&test_config())))
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", token)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", token)
        .body(Body::empty())
        .unwrap()
}

fn put_empty(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("authorization", token)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_rider(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            RIDER_TOKEN,
            json!({
                "name": "Test Rider",
                "type": "Rider",
                "phone": "0987654321",
                "email": "r@test.com"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// Registers a driver and brings them online: Toyota Camry, 4 seats,
/// available at the given position.
async fn register_available_driver(app: &axum::Router, lat: f64, lng: f64) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            DRIVER_TOKEN,
            json!({
                "name": "Test Driver",
                "type": "Driver",
                "phone": "1234567890",
                "email": "d@test.com"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let driver = body_json(response).await;
    let driver_id = driver["user"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/drivers/details",
            DRIVER_TOKEN,
            json!({
                "car_model": "Toyota Camry",
                "license_plate": "TEST123",
                "insurance_number": "INS123",
                "total_seats": 4
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/drivers/availability",
            DRIVER_TOKEN,
            json!({
                "available": true,
                "available_seats": 4,
                "pickup_location": { "lat": lat, "lng": lng, "address": "Driver St" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    driver_id
}

async fn book_ride(app: &axum::Router, driver_id: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rides",
            RIDER_TOKEN,
            json!({
                "pickup_location": {
                    "lat": 37.7749,
                    "lng": -122.4194,
                    "address": "123 Test St, San Francisco, CA"
                },
                "polling_location_id": "test_location_1",
                "driver_id": driver_id,
                "pickup_time": "2026-11-03T09:00:00Z",
                "tip_amount": 5.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn driver_available_seats(app: &axum::Router) -> u64 {
    let response = app
        .clone()
        .oneshot(get_request("/api/auth/profile", DRIVER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    profile["driver_details"]["available_seats"].as_u64().unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", RIDER_TOKEN)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["users"], 0);
    assert_eq!(body["rides"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics", RIDER_TOKEN)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));
}

#[tokio::test]
async fn register_creates_user_with_default_preferences() {
    let app = setup();
    let body = register_rider(&app).await;

    assert_eq!(body["user"]["name"], "Test Rider");
    assert_eq!(body["user"]["type"], "Rider");
    assert_eq!(body["user"]["email"], "r@test.com");

    let response = app
        .oneshot(get_request("/api/auth/profile", RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let profile = body_json(response).await;
    assert_eq!(profile["preferences"]["email_enabled"], true);
    assert_eq!(profile["preferences"]["push_enabled"], true);
    assert_eq!(profile["preferences"]["sms_enabled"], true);
    assert!(profile["driver_details"].is_null());
}

#[tokio::test]
async fn register_twice_conflicts() {
    let app = setup();
    register_rider(&app).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            RIDER_TOKEN,
            json!({
                "name": "Test Rider",
                "type": "Rider",
                "email": "r@test.com"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_rejects_invalid_input_with_details() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            RIDER_TOKEN,
            json!({
                "name": "X",
                "type": "Rider",
                "email": "not-an-email"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid input");
    assert!(body["details"].is_object());
}

#[tokio::test]
async fn profile_before_registration_is_not_found() {
    let app = setup();
    let response = app
        .oneshot(get_request("/api/auth/profile", RIDER_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_profile_merges_provided_fields() {
    let app = setup();
    register_rider(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/auth/profile",
            RIDER_TOKEN,
            json!({ "emergency_contact": "555-0000" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let profile = body_json(response).await;
    assert_eq!(profile["user"]["name"], "Test Rider");
    assert_eq!(profile["user"]["phone"], "0987654321");
    assert_eq!(profile["user"]["emergency_contact"], "555-0000");
}

#[tokio::test]
async fn driver_endpoints_reject_riders() {
    let app = setup();
    register_rider(&app).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/drivers/details",
            RIDER_TOKEN,
            json!({
                "car_model": "Toyota Camry",
                "license_plate": "TEST123",
                "insurance_number": "INS123",
                "total_seats": 4
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn driver_details_reject_out_of_range_seats() {
    let app = setup();
    register_available_driver(&app, 37.77, -122.42).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/drivers/details",
            DRIVER_TOKEN,
            json!({
                "car_model": "Bus",
                "license_plate": "BIG1",
                "insurance_number": "INS999",
                "total_seats": 9
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verification_flow() {
    let app = setup();
    register_available_driver(&app, 37.77, -122.42).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/drivers/verification-status", DRIVER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/drivers/verify",
            DRIVER_TOKEN,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["verification"]["status"], "Pending");

    let response = app
        .oneshot(get_request("/api/drivers/verification-status", DRIVER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["verification_status"], "Pending");
    assert!(body["verified_at"].is_null());
}

#[tokio::test]
async fn location_update_round_trips_through_available_drivers() {
    let app = setup();
    register_available_driver(&app, 0.0, 0.0).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/drivers/location",
            DRIVER_TOKEN,
            json!({ "lat": 37.77, "lng": -122.42, "available_seats": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["location"]["available_seats"], 3);

    let response = app
        .oneshot(get_request(
            "/api/locations/drivers/available?lat=37.77&lng=-122.42&radius=5",
            RIDER_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let drivers = body["drivers"].as_array().unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0]["name"], "Test Driver");
    assert_eq!(drivers[0]["available_seats"], 3);
    assert!(drivers[0]["distance"].as_f64().unwrap() < 0.01);
}

#[tokio::test]
async fn available_drivers_excludes_out_of_radius_and_offline() {
    let app = setup();
    register_available_driver(&app, 38.5, -122.42).await;

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/locations/drivers/available?lat=37.77&lng=-122.42&radius=5",
            RIDER_TOKEN,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["drivers"].as_array().unwrap().len(), 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/drivers/availability",
            DRIVER_TOKEN,
            json!({
                "available": false,
                "pickup_location": { "lat": 37.77, "lng": -122.42, "address": "Driver St" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(
            "/api/locations/drivers/available?lat=37.77&lng=-122.42&radius=5",
            RIDER_TOKEN,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["drivers"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn available_drivers_requires_coordinates() {
    let app = setup();
    let response = app
        .oneshot(get_request("/api/locations/drivers/available", RIDER_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn polling_lookup_requires_address_or_coordinates() {
    let app = setup();
    let response = app
        .oneshot(get_request("/api/locations/polling", RIDER_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("address or coordinates"));
}

#[tokio::test]
async fn booking_takes_a_seat_and_cancelling_returns_it() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    assert_eq!(booked["ride"]["status"], "Scheduled");
    assert_eq!(driver_available_seats(&app).await, 3);

    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/rides/{ride_id}/cancel"),
            RIDER_TOKEN,
            json!({ "reason": "plans changed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ride"]["status"], "Cancelled");
    assert_eq!(body["ride"]["cancellation_reason"], "plans changed");
    assert_eq!(driver_available_seats(&app).await, 4);
}

#[tokio::test]
async fn cancelling_twice_conflicts_without_double_increment() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(put_empty(&format!("/api/rides/{ride_id}/cancel"), RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(driver_available_seats(&app).await, 4);

    let response = app
        .clone()
        .oneshot(put_empty(&format!("/api/rides/{ride_id}/cancel"), RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(driver_available_seats(&app).await, 4);
}

#[tokio::test]
async fn booking_with_no_seats_fails_and_creates_no_ride() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/drivers/availability",
            DRIVER_TOKEN,
            json!({ "available": true, "available_seats": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rides",
            RIDER_TOKEN,
            json!({
                "pickup_location": {
                    "lat": 37.7749,
                    "lng": -122.4194,
                    "address": "123 Test St"
                },
                "polling_location_id": "test_location_1",
                "driver_id": driver_id,
                "pickup_time": "2026-11-03T09:00:00Z",
                "tip_amount": 0.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get_request("/api/rides", RIDER_TOKEN))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["rides"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn drivers_cannot_book_rides() {
    let app = setup();
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/rides",
            DRIVER_TOKEN,
            json!({
                "pickup_location": {
                    "lat": 37.7749,
                    "lng": -122.4194,
                    "address": "123 Test St"
                },
                "polling_location_id": "test_location_1",
                "driver_id": driver_id,
                "pickup_time": "2026-11-03T09:00:00Z",
                "tip_amount": 0.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ride_status_walks_the_state_machine() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();

    // Completing a ride that was never picked up is rejected.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/rides/{ride_id}/status"),
            DRIVER_TOKEN,
            json!({ "status": "Completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/rides/{ride_id}/status"),
            DRIVER_TOKEN,
            json!({ "status": "PickedUp" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(driver_available_seats(&app).await, 3);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/rides/{ride_id}/status"),
            DRIVER_TOKEN,
            json!({ "status": "Completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ride"]["status"], "Completed");
    assert!(!body["ride"]["completed_time"].is_null());
    assert_eq!(driver_available_seats(&app).await, 4);
}

#[tokio::test]
async fn riders_cannot_update_ride_status() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/rides/{ride_id}/status"),
            RIDER_TOKEN,
            json!({ "status": "PickedUp" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rating_recomputes_the_driver_average() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    for rating in [5, 2] {
        let booked = book_ride(&app, &driver_id).await;
        let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();

        for status in ["PickedUp", "Completed"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "PUT",
                    &format!("/api/rides/{ride_id}/status"),
                    DRIVER_TOKEN,
                    json!({ "status": status }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/rider/rides/{ride_id}/rate"),
                RIDER_TOKEN,
                json!({ "rating": rating, "comment": "thanks" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .oneshot(get_request("/api/auth/profile", DRIVER_TOKEN))
        .await
        .unwrap();
    let profile = body_json(response).await;
    let average = profile["driver_details"]["average_rating"].as_f64().unwrap();
    assert!((average - 3.5).abs() < 1e-9);
}

#[tokio::test]
async fn rating_a_scheduled_ride_conflicts() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/rider/rides/{ride_id}/rate"),
            RIDER_TOKEN,
            json!({ "rating": 5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn rider_stats_count_by_status_and_sum_tips() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();
    for status in ["PickedUp", "Completed"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/rides/{ride_id}/status"),
                DRIVER_TOKEN,
                json!({ "status": status }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(put_empty(&format!("/api/rides/{ride_id}/cancel"), RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/rider/stats", RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["stats"]["completed"], 1);
    assert_eq!(body["stats"]["cancelled"], 1);
    assert_eq!(body["stats"]["scheduled"], 0);
    assert_eq!(body["stats"]["total_tips_given"], 5.0);
}

#[tokio::test]
async fn ride_history_paginates_with_has_more() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    for _ in 0..3 {
        let booked = book_ride(&app, &driver_id).await;
        let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();
        let response = app
            .clone()
            .oneshot(put_empty(&format!("/api/rides/{ride_id}/cancel"), RIDER_TOKEN))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/rider/rides?limit=2&offset=0", RIDER_TOKEN))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["rides"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["has_more"], true);

    let response = app
        .oneshot(get_request("/api/rider/rides?limit=2&offset=2", RIDER_TOKEN))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["rides"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["has_more"], false);
}

#[tokio::test]
async fn rider_cannot_hold_two_scheduled_rides() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    book_ride(&app, &driver_id).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rides",
            RIDER_TOKEN,
            json!({
                "pickup_location": {
                    "lat": 37.7749,
                    "lng": -122.4194,
                    "address": "123 Test St"
                },
                "polling_location_id": "test_location_1",
                "driver_id": driver_id,
                "pickup_time": "2026-11-03T10:00:00Z",
                "tip_amount": 0.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(driver_available_seats(&app).await, 3);
}

#[tokio::test]
async fn booking_notifies_the_driver() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    book_ride(&app, &driver_id).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/notifications?unread_only=true", DRIVER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["title"], "New ride scheduled");
    assert_eq!(notifications[0]["read"], false);
    let notification_id = notifications[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(put_empty(
            &format!("/api/notifications/{notification_id}/read"),
            DRIVER_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["notification"]["read"], true);

    let response = app
        .oneshot(get_request("/api/notifications?unread_only=true", DRIVER_TOKEN))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["notifications"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn riders_cannot_read_other_users_notifications() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    book_ride(&app, &driver_id).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/notifications", DRIVER_TOKEN))
        .await
        .unwrap();
    let body = body_json(response).await;
    let notification_id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(put_empty(
            &format!("/api/notifications/{notification_id}/read"),
            RIDER_TOKEN,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn read_all_is_idempotent() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(put_empty(&format!("/api/rides/{ride_id}/cancel"), RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(put_empty("/api/notifications/read-all", DRIVER_TOKEN))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .oneshot(get_request("/api/notifications?unread_only=true", DRIVER_TOKEN))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["notifications"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn preferences_upsert() {
    let app = setup();
    register_rider(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/notifications/preferences",
            RIDER_TOKEN,
            json!({ "email_enabled": false, "push_enabled": true, "sms_enabled": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["preferences"]["email_enabled"], false);
    assert_eq!(body["preferences"]["sms_enabled"], false);

    let response = app
        .oneshot(get_request("/api/auth/profile", RIDER_TOKEN))
        .await
        .unwrap();
    let profile = body_json(response).await;
    assert_eq!(profile["preferences"]["email_enabled"], false);
}

#[tokio::test]
async fn rider_endpoints_reject_drivers() {
    let app = setup();
    register_available_driver(&app, 37.7749, -122.4194).await;

    let response = app
        .oneshot(get_request("/api/rider/stats", DRIVER_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn full_scenario_metrics_record_ride_events() {
    let app = setup();
    register_rider(&app).await;
    let driver_id = register_available_driver(&app, 37.7749, -122.4194).await;

    let booked = book_ride(&app, &driver_id).await;
    let ride_id = booked["ride"]["id"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(put_empty(&format!("/api/rides/{ride_id}/cancel"), RIDER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/metrics", RIDER_TOKEN)).await.unwrap();
    let body = body_string(response).await;
    assert!(body.contains("ride_events_total"));
    assert!(body.contains("driver_seat_utilization"));
}
