use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDetails {
    pub user_id: Uuid,
    pub car_model: Option<String>,
    pub license_plate: Option<String>,
    pub insurance_number: Option<String>,
    pub total_seats: u8,
    pub available_seats: u8,
    pub available: bool,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub average_rating: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl DriverDetails {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            car_model: None,
            license_plate: None,
            insurance_number: None,
            total_seats: 0,
            available_seats: 0,
            available: false,
            current_lat: None,
            current_lng: None,
            average_rating: None,
            updated_at: Utc::now(),
        }
    }

    /// Seats never exceed the vehicle's capacity.
    pub fn clamp_seats(&self, requested: u8) -> u8 {
        requested.min(self.total_seats)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverVerification {
    pub driver_user_id: Uuid,
    pub status: VerificationStatus,
    pub id_image_url: String,
    pub driver_license_url: String,
    pub verified_at: Option<DateTime<Utc>>,
}
