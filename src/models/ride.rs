use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RideStatus {
    Scheduled,
    PickedUp,
    Completed,
    Cancelled,
    NoShow,
}

impl RideStatus {
    /// Transitions are one-directional: Scheduled -> PickedUp | Cancelled,
    /// PickedUp -> Completed | NoShow. Everything else is rejected.
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        matches!(
            (self, next),
            (RideStatus::Scheduled, RideStatus::PickedUp)
                | (RideStatus::Scheduled, RideStatus::Cancelled)
                | (RideStatus::PickedUp, RideStatus::Completed)
                | (RideStatus::PickedUp, RideStatus::NoShow)
        )
    }

    /// Statuses that hold a seat on the driver's vehicle.
    pub fn is_active(self) -> bool {
        matches!(self, RideStatus::Scheduled | RideStatus::PickedUp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Uuid,
    pub status: RideStatus,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: String,
    pub polling_location_id: String,
    pub pickup_time: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
    pub tip_amount: f64,
    pub driver_rating: Option<u8>,
    pub driver_rating_comment: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.rider_id == user_id || self.driver_id == user_id
    }
}
