use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::rest::auth::{apply_profile_update, UpdateProfileRequest};
use crate::api::rest::{validated, Pagination, DEFAULT_PAGE_LIMIT};
use crate::auth::Identity;
use crate::engine::rating;
use crate::error::AppError;
use crate::models::ride::{Ride, RideStatus};
use crate::models::user::{User, UserType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/rides", get(ride_history))
        .route("/stats", get(ride_stats))
        .route("/rides/:id/rate", post(rate_driver))
}

#[derive(Deserialize)]
pub struct RideHistoryQuery {
    pub status: Option<RideStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize, Validate)]
pub struct RateDriverRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Serialize)]
struct RideStats {
    scheduled: usize,
    picked_up: usize,
    completed: usize,
    cancelled: usize,
    no_show: usize,
    total_tips_given: f64,
}

fn require_rider(state: &AppState, identity: &Identity) -> Result<User, AppError> {
    let user = state.require_user(&identity.0)?;
    if user.user_type != UserType::Rider {
        return Err(AppError::Forbidden(
            "access denied, riders only".to_string(),
        ));
    }
    Ok(user)
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_rider(&state, &identity)?;
    let preferences = state
        .preferences
        .get(&user.id)
        .map(|entry| entry.value().clone());

    Ok(Json(json!({ "profile": user, "preferences": preferences })))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = validated(payload)?;
    let user = require_rider(&state, &identity)?;

    let updated = apply_profile_update(&state, user.id, payload)?;
    let preferences = state
        .preferences
        .get(&updated.id)
        .map(|entry| entry.value().clone());

    Ok(Json(json!({ "profile": updated, "preferences": preferences })))
}

async fn ride_history(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<RideHistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_rider(&state, &identity)?;

    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .filter(|entry| entry.rider_id == user.id)
        .filter(|entry| query.status.is_none_or(|status| entry.status == status))
        .map(|entry| entry.value().clone())
        .collect();

    rides.sort_by(|a, b| b.pickup_time.cmp(&a.pickup_time));

    let total = rides.len();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let page: Vec<Ride> = rides.into_iter().skip(offset).take(limit).collect();
    let pagination = Pagination::new(total, limit, offset, page.len());

    Ok(Json(json!({ "rides": page, "pagination": pagination })))
}

async fn ride_stats(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_rider(&state, &identity)?;

    let mut stats = RideStats {
        scheduled: 0,
        picked_up: 0,
        completed: 0,
        cancelled: 0,
        no_show: 0,
        total_tips_given: 0.0,
    };

    for entry in state.rides.iter().filter(|e| e.rider_id == user.id) {
        match entry.status {
            RideStatus::Scheduled => stats.scheduled += 1,
            RideStatus::PickedUp => stats.picked_up += 1,
            RideStatus::Completed => {
                stats.completed += 1;
                stats.total_tips_given += entry.tip_amount;
            }
            RideStatus::Cancelled => stats.cancelled += 1,
            RideStatus::NoShow => stats.no_show += 1,
        }
    }

    Ok(Json(json!({ "stats": stats })))
}

async fn rate_driver(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<RateDriverRequest>,
) -> Result<StatusCode, AppError> {
    let payload = validated(payload)?;
    let user = require_rider(&state, &identity)?;

    rating::rate_driver(&state, &user, ride_id, payload.rating, payload.comment)?;

    Ok(StatusCode::NO_CONTENT)
}
