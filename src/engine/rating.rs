use chrono::Utc;
use uuid::Uuid;

use crate::engine::events::{self, RideEvent};
use crate::error::AppError;
use crate::models::ride::RideStatus;
use crate::models::user::User;
use crate::state::AppState;

/// Record a rider's rating for a completed ride and recompute the
/// driver's average as the mean over all of that driver's rated rides.
/// The recompute runs while the driver-details entry guard is held, so
/// concurrent ratings for one driver serialize and the stored average
/// always reflects every committed rating.
pub fn rate_driver(
    state: &AppState,
    rider: &User,
    ride_id: Uuid,
    rating: u8,
    comment: Option<String>,
) -> Result<(), AppError> {
    let snapshot = state
        .rides
        .get(&ride_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if snapshot.rider_id != rider.id {
        return Err(AppError::Forbidden(
            "not authorized to rate this ride".to_string(),
        ));
    }

    if snapshot.status != RideStatus::Completed {
        return Err(AppError::Conflict(
            "can only rate completed rides".to_string(),
        ));
    }

    let driver_id = snapshot.driver_id;
    let mut details = state
        .driver_details
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::Internal("driver details missing for ride".to_string()))?;

    let updated = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;
        ride.driver_rating = Some(rating);
        ride.driver_rating_comment = comment;
        ride.clone()
    };

    let (sum, count) = state
        .rides
        .iter()
        .filter(|entry| entry.driver_id == driver_id)
        .filter_map(|entry| entry.driver_rating)
        .fold((0u32, 0u32), |(sum, count), rating| {
            (sum + u32::from(rating), count + 1)
        });

    details.average_rating = Some(f64::from(sum) / f64::from(count));
    details.updated_at = Utc::now();
    drop(details);

    events::on_ride_event(state, RideEvent::Rated, &updated);

    Ok(())
}
