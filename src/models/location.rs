use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A pickup point as supplied by clients: coordinates plus the
/// human-readable address shown to the driver.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PickupPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub address: String,
}

impl PickupPoint {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Uniform polling-place record mapped from the civic-data upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingPlace {
    pub location_name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub polling_hours: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

/// A driver candidate returned by the nearby-driver lookup.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableDriver {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub available_seats: u8,
    pub average_rating: Option<f64>,
    pub distance: f64,
}
