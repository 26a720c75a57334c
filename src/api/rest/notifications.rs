use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::rest::{Pagination, DEFAULT_PAGE_LIMIT};
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::notification::Notification;
use crate::models::user::UserPreferences;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", put(mark_as_read))
        .route("/read-all", put(mark_all_as_read))
        .route("/preferences", put(update_preferences))
}

#[derive(Deserialize)]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct PreferencesRequest {
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state.require_user(&identity.0)?;
    let unread_only = query.unread_only.unwrap_or(false);

    let mut notifications: Vec<Notification> = state
        .notifications
        .iter()
        .filter(|entry| entry.user_id == user.id)
        .filter(|entry| !unread_only || !entry.read)
        .map(|entry| entry.value().clone())
        .collect();

    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = notifications.len();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let page: Vec<Notification> = notifications.into_iter().skip(offset).take(limit).collect();
    let pagination = Pagination::new(total, limit, offset, page.len());

    Ok(Json(
        json!({ "notifications": page, "pagination": pagination }),
    ))
}

async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state.require_user(&identity.0)?;

    let mut notification = state
        .notifications
        .get_mut(&notification_id)
        .ok_or_else(|| AppError::NotFound("notification not found".to_string()))?;

    if notification.user_id != user.id {
        return Err(AppError::Forbidden(
            "not authorized to update this notification".to_string(),
        ));
    }

    notification.read = true;

    Ok(Json(json!({ "notification": notification.clone() })))
}

async fn mark_all_as_read(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<StatusCode, AppError> {
    let user = state.require_user(&identity.0)?;

    for mut entry in state.notifications.iter_mut() {
        if entry.user_id == user.id {
            entry.read = true;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn update_preferences(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<PreferencesRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state.require_user(&identity.0)?;

    let preferences = UserPreferences {
        user_id: user.id,
        email_enabled: payload.email_enabled,
        push_enabled: payload.push_enabled,
        sms_enabled: payload.sms_enabled,
    };

    state.preferences.insert(user.id, preferences.clone());

    Ok(Json(json!({ "preferences": preferences })))
}
