use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::rest::{validated, DEFAULT_PAGE_LIMIT};
use crate::auth::Identity;
use crate::engine::booking::{self, BookRide};
use crate::error::AppError;
use crate::models::location::PickupPoint;
use crate::models::ride::{Ride, RideStatus};
use crate::models::user::UserType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(book_ride).get(list_rides))
        .route("/:id", get(ride_details))
        .route("/:id/cancel", put(cancel_ride))
        .route("/:id/status", put(update_ride_status))
}

#[derive(Deserialize, Validate)]
pub struct BookRideRequest {
    #[validate(nested)]
    pub pickup_location: PickupPoint,
    pub polling_location_id: String,
    pub driver_id: Uuid,
    pub pickup_time: DateTime<Utc>,
    #[validate(range(min = 0.0))]
    pub tip_amount: f64,
}

#[derive(Deserialize)]
pub struct CancelRideRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateRideStatusRequest {
    pub status: RideStatus,
}

#[derive(Deserialize)]
pub struct RideListQuery {
    pub status: Option<RideStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

async fn book_ride(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<BookRideRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let payload = validated(payload)?;
    let user = state.require_user(&identity.0)?;

    if user.user_type != UserType::Rider {
        return Err(AppError::Forbidden(
            "only riders can book rides".to_string(),
        ));
    }

    let ride = booking::book_ride(
        &state,
        &user,
        BookRide {
            pickup: payload.pickup_location,
            polling_location_id: payload.polling_location_id,
            driver_id: payload.driver_id,
            pickup_time: payload.pickup_time,
            tip_amount: payload.tip_amount,
        },
    )?;

    Ok((StatusCode::CREATED, Json(json!({ "ride": ride }))))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(ride_id): Path<Uuid>,
    payload: Option<Json<CancelRideRequest>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state.require_user(&identity.0)?;
    let reason = payload.and_then(|Json(body)| body.reason);

    let ride = booking::cancel_ride(&state, &user, ride_id, reason)?;
    Ok(Json(json!({ "ride": ride })))
}

async fn update_ride_status(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<UpdateRideStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !matches!(
        payload.status,
        RideStatus::PickedUp | RideStatus::Completed | RideStatus::NoShow
    ) {
        return Err(AppError::BadRequest(
            "status must be PickedUp, Completed or NoShow".to_string(),
        ));
    }

    let user = state.require_user(&identity.0)?;
    if user.user_type != UserType::Driver {
        return Err(AppError::Forbidden(
            "only drivers can update ride status".to_string(),
        ));
    }

    let ride = booking::update_ride_status(&state, &user, ride_id, payload.status)?;
    Ok(Json(json!({ "ride": ride })))
}

async fn list_rides(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<RideListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state.require_user(&identity.0)?;

    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .filter(|entry| match user.user_type {
            UserType::Rider => entry.rider_id == user.id,
            UserType::Driver => entry.driver_id == user.id,
        })
        .filter(|entry| query.status.is_none_or(|status| entry.status == status))
        .map(|entry| entry.value().clone())
        .collect();

    rides.sort_by(|a, b| b.pickup_time.cmp(&a.pickup_time));

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let page: Vec<Ride> = rides.into_iter().skip(offset).take(limit).collect();

    Ok(Json(json!({ "rides": page })))
}

async fn ride_details(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state.require_user(&identity.0)?;

    let ride = state
        .rides
        .get(&ride_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if !ride.involves(user.id) {
        return Err(AppError::Forbidden(
            "not authorized to view this ride".to_string(),
        ));
    }

    Ok(Json(json!({ "ride": ride })))
}
