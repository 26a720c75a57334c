use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::api::rest::validated;
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::driver::{DriverVerification, VerificationStatus};
use crate::models::location::PickupPoint;
use crate::models::user::{User, UserType};
use crate::state::AppState;

// File storage is an external collaborator; the upload endpoint records
// placeholder URLs the way the document pipeline would.
const PLACEHOLDER_ID_URL: &str = "placeholder_id_url";
const PLACEHOLDER_LICENSE_URL: &str = "placeholder_license_url";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/details", put(update_details))
        .route("/location", put(update_location))
        .route("/availability", put(update_availability))
        .route("/verify", post(upload_verification_docs))
        .route("/verification-status", get(verification_status))
}

#[derive(Deserialize, Validate)]
pub struct DriverDetailsRequest {
    #[validate(length(min = 2))]
    pub car_model: String,
    #[validate(length(min = 2))]
    pub license_plate: String,
    #[validate(length(min = 2))]
    pub insurance_number: String,
    #[validate(range(min = 1, max = 8))]
    pub total_seats: u8,
}

#[derive(Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub available_seats: u8,
}

#[derive(Deserialize, Validate)]
pub struct AvailabilityRequest {
    pub available: bool,
    pub available_seats: Option<u8>,
    #[validate(nested)]
    pub pickup_location: Option<PickupPoint>,
}

#[derive(Serialize)]
struct VerificationStatusResponse {
    verification_status: VerificationStatus,
    verified_at: Option<DateTime<Utc>>,
}

fn require_driver(state: &AppState, identity: &Identity) -> Result<User, AppError> {
    let user = state.require_user(&identity.0)?;
    if user.user_type != UserType::Driver {
        return Err(AppError::Forbidden("user is not a driver".to_string()));
    }
    Ok(user)
}

async fn update_details(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<DriverDetailsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = validated(payload)?;
    let user = require_driver(&state, &identity)?;

    let mut details = state
        .driver_details
        .get_mut(&user.id)
        .ok_or_else(|| AppError::NotFound("driver details not found".to_string()))?;

    details.car_model = Some(payload.car_model);
    details.license_plate = Some(payload.license_plate);
    details.insurance_number = Some(payload.insurance_number);
    details.total_seats = payload.total_seats;
    details.available_seats = details.clamp_seats(details.available_seats);
    details.updated_at = Utc::now();

    Ok(Json(json!({ "details": details.clone() })))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<LocationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = validated(payload)?;
    let user = require_driver(&state, &identity)?;

    let mut details = state
        .driver_details
        .get_mut(&user.id)
        .ok_or_else(|| AppError::NotFound("driver details not found".to_string()))?;

    details.current_lat = Some(payload.lat);
    details.current_lng = Some(payload.lng);
    details.available_seats = details.clamp_seats(payload.available_seats);
    details.updated_at = Utc::now();

    Ok(Json(json!({
        "location": {
            "lat": details.current_lat,
            "lng": details.current_lng,
            "available_seats": details.available_seats,
        }
    })))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = validated(payload)?;
    let user = require_driver(&state, &identity)?;

    let mut details = state
        .driver_details
        .get_mut(&user.id)
        .ok_or_else(|| AppError::NotFound("driver details not found".to_string()))?;

    details.available = payload.available;
    if let Some(seats) = payload.available_seats {
        details.available_seats = details.clamp_seats(seats);
    }
    if let Some(pickup) = payload.pickup_location {
        details.current_lat = Some(pickup.lat);
        details.current_lng = Some(pickup.lng);
    }
    details.updated_at = Utc::now();

    Ok(Json(json!({
        "availability": {
            "available": details.available,
            "available_seats": details.available_seats,
            "current_location": details.current_lat.zip(details.current_lng).map(
                |(lat, lng)| json!({ "lat": lat, "lng": lng }),
            ),
        }
    })))
}

async fn upload_verification_docs(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_driver(&state, &identity)?;

    if !state.driver_details.contains_key(&user.id) {
        return Err(AppError::NotFound("driver details not found".to_string()));
    }

    let verification = DriverVerification {
        driver_user_id: user.id,
        status: VerificationStatus::Pending,
        id_image_url: PLACEHOLDER_ID_URL.to_string(),
        driver_license_url: PLACEHOLDER_LICENSE_URL.to_string(),
        verified_at: None,
    };

    state.verifications.insert(user.id, verification.clone());

    Ok(Json(json!({ "verification": verification })))
}

async fn verification_status(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<VerificationStatusResponse>, AppError> {
    let user = require_driver(&state, &identity)?;

    let verification = state
        .verifications
        .get(&user.id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("no verification record found".to_string()))?;

    Ok(Json(VerificationStatusResponse {
        verification_status: verification.status,
        verified_at: verification.verified_at,
    }))
}
