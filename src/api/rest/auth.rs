use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::rest::validated;
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::driver::DriverDetails;
use crate::models::user::{User, UserPreferences, UserType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/profile", get(get_profile).put(update_profile))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2))]
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Serialize)]
struct ProfileResponse {
    user: User,
    preferences: Option<UserPreferences>,
    driver_details: Option<DriverDetails>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let payload = validated(payload)?;

    let user = User {
        id: Uuid::new_v4(),
        clerk_id: identity.0.clone(),
        name: payload.name,
        email: payload.email,
        user_type: payload.user_type,
        phone: payload.phone,
        emergency_contact: None,
        created_at: Utc::now(),
    };

    // The identity map is the uniqueness gate; claiming the entry first
    // keeps concurrent registrations for one identity from both passing.
    match state.identities.entry(identity.0) {
        Entry::Occupied(_) => {
            return Err(AppError::Conflict("user already registered".to_string()));
        }
        Entry::Vacant(slot) => {
            slot.insert(user.id);
        }
    }

    state
        .preferences
        .insert(user.id, UserPreferences::defaults_for(user.id));

    if user.user_type == UserType::Driver {
        state
            .driver_details
            .insert(user.id, DriverDetails::empty(user.id));
    }

    state.users.insert(user.id, user.clone());

    tracing::info!(user_id = %user.id, user_type = ?user.user_type, "user registered");

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state.require_user(&identity.0)?;
    Ok(Json(profile_of(&state, user)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let payload = validated(payload)?;
    let user = state.require_user(&identity.0)?;

    let updated = apply_profile_update(&state, user.id, payload)?;
    Ok(Json(profile_of(&state, updated)))
}

/// Merge the provided fields into the user row; absent fields stay.
pub fn apply_profile_update(
    state: &AppState,
    user_id: Uuid,
    payload: UpdateProfileRequest,
) -> Result<User, AppError> {
    let mut user = state
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(phone) = payload.phone {
        user.phone = Some(phone);
    }
    if let Some(emergency_contact) = payload.emergency_contact {
        user.emergency_contact = Some(emergency_contact);
    }

    Ok(user.clone())
}

fn profile_of(state: &AppState, user: User) -> ProfileResponse {
    let preferences = state
        .preferences
        .get(&user.id)
        .map(|entry| entry.value().clone());
    let driver_details = match user.user_type {
        UserType::Driver => state
            .driver_details
            .get(&user.id)
            .map(|entry| entry.value().clone()),
        UserType::Rider => None,
    };

    ProfileResponse {
        user,
        preferences,
        driver_details,
    }
}
