use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Identity;
use crate::error::AppError;
use crate::geo::{haversine_miles, BoundingBox};
use crate::models::location::{AvailableDriver, GeoPoint, PollingPlace};
use crate::state::AppState;

const DEFAULT_RADIUS_MILES: f64 = 5.0;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/polling", get(polling_locations))
        .route("/drivers/available", get(available_drivers))
}

#[derive(Deserialize)]
pub struct PollingQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct AvailableDriversQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Serialize)]
struct RankedPollingPlace {
    #[serde(flatten)]
    place: PollingPlace,
    distance: f64,
}

async fn polling_locations(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
    Query(query): Query<PollingQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let origin = match (query.address, query.lat, query.lng) {
        (Some(address), _, _) => {
            let geocoded = state.civic.geocode(&address).await?;
            GeoPoint {
                lat: geocoded.lat,
                lng: geocoded.lng,
            }
        }
        (None, Some(lat), Some(lng)) => GeoPoint { lat, lng },
        _ => {
            return Err(AppError::BadRequest(
                "either address or coordinates (lat/lng) must be provided".to_string(),
            ));
        }
    };

    let mut ranked: Vec<RankedPollingPlace> = state
        .civic
        .polling_places(origin.lat, origin.lng)
        .await?
        .into_iter()
        .map(|place| {
            let there = GeoPoint {
                lat: place.lat,
                lng: place.lng,
            };
            let distance = round_miles(haversine_miles(&origin, &there));
            RankedPollingPlace { place, distance }
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(Json(json!({ "polling_locations": ranked })))
}

async fn available_drivers(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
    Query(query): Query<AvailableDriversQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(AppError::BadRequest(
            "coordinates (lat/lng) must be provided".to_string(),
        ));
    };

    let origin = GeoPoint { lat, lng };
    let radius = query.radius.unwrap_or(DEFAULT_RADIUS_MILES);

    // Cheap degree box first, exact great-circle distance only for the
    // candidates that survive it.
    let boxed = BoundingBox::around(&origin, radius);

    let mut drivers: Vec<AvailableDriver> = state
        .driver_details
        .iter()
        .filter(|details| details.available && details.available_seats > 0)
        .filter_map(|details| {
            let position = GeoPoint {
                lat: details.current_lat?,
                lng: details.current_lng?,
            };
            if !boxed.contains(&position) {
                return None;
            }

            let distance = round_miles(haversine_miles(&origin, &position));
            if distance > radius {
                return None;
            }

            let user = state.users.get(&details.user_id)?;
            Some(AvailableDriver {
                id: user.id,
                name: user.name.clone(),
                phone: user.phone.clone(),
                lat: position.lat,
                lng: position.lng,
                available_seats: details.available_seats,
                average_rating: details.average_rating,
                distance,
            })
        })
        .collect();

    drivers.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(Json(json!({ "drivers": drivers })))
}

fn round_miles(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}
