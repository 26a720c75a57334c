pub mod auth;
pub mod drivers;
pub mod locations;
pub mod notifications;
pub mod rider;
pub mod rides;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::error::AppError;
use crate::state::AppState;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/drivers", drivers::router())
        .nest("/locations", locations::router())
        .nest("/rides", rides::router())
        .nest("/rider", rider::router())
        .nest("/notifications", notifications::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::resolve_identity,
        ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reject a request body eagerly when its schema check fails, before any
/// domain logic runs.
pub fn validated<T: Validate>(payload: T) -> Result<T, AppError> {
    payload.validate()?;
    Ok(payload)
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: usize, limit: usize, offset: usize, page_len: usize) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset + page_len < total,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
    rides: usize,
    notifications: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        users: state.users.len(),
        rides: state.rides.len(),
        notifications: state.notifications.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
