use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::events::{self, RideEvent};
use crate::error::AppError;
use crate::models::driver::DriverDetails;
use crate::models::location::PickupPoint;
use crate::models::ride::{Ride, RideStatus};
use crate::models::user::{User, UserType};
use crate::state::AppState;

pub struct BookRide {
    pub pickup: PickupPoint,
    pub polling_location_id: String,
    pub driver_id: Uuid,
    pub pickup_time: DateTime<Utc>,
    pub tip_amount: f64,
}

/// Create a ride and take one of the driver's seats. Both writes happen
/// while the driver-details entry guard is held, so concurrent bookings
/// against the same driver serialize and can never push the seat count
/// below zero.
pub fn book_ride(state: &AppState, rider: &User, input: BookRide) -> Result<Ride, AppError> {
    let has_active_ride = state
        .rides
        .iter()
        .any(|entry| entry.rider_id == rider.id && entry.status.is_active());
    if has_active_ride {
        return Err(AppError::Conflict(
            "rider already has an active ride".to_string(),
        ));
    }

    let driver_is_driver = state
        .users
        .get(&input.driver_id)
        .map(|user| user.user_type == UserType::Driver)
        .unwrap_or(false);
    if !driver_is_driver {
        return Err(AppError::DriverUnavailable);
    }

    let mut details = state
        .driver_details
        .get_mut(&input.driver_id)
        .ok_or(AppError::DriverUnavailable)?;

    if !details.available || details.available_seats == 0 {
        return Err(AppError::DriverUnavailable);
    }

    let ride = Ride {
        id: Uuid::new_v4(),
        rider_id: rider.id,
        driver_id: input.driver_id,
        status: RideStatus::Scheduled,
        pickup_lat: input.pickup.lat,
        pickup_lng: input.pickup.lng,
        pickup_address: input.pickup.address,
        polling_location_id: input.polling_location_id,
        pickup_time: input.pickup_time,
        completed_time: None,
        tip_amount: input.tip_amount,
        driver_rating: None,
        driver_rating_comment: None,
        cancellation_reason: None,
        created_at: Utc::now(),
    };

    state.rides.insert(ride.id, ride.clone());

    details.available_seats -= 1;
    details.updated_at = Utc::now();
    update_utilization(state, &details);
    drop(details);

    events::on_ride_event(state, RideEvent::Booked, &ride);

    tracing::info!(
        ride_id = %ride.id,
        rider_id = %ride.rider_id,
        driver_id = %ride.driver_id,
        "ride booked"
    );

    Ok(ride)
}

/// Cancel a scheduled ride and return the seat to the driver. The status
/// re-check runs under the driver guard, so a second cancel attempt hits
/// Conflict and the seat is incremented exactly once.
pub fn cancel_ride(
    state: &AppState,
    caller: &User,
    ride_id: Uuid,
    reason: Option<String>,
) -> Result<Ride, AppError> {
    let snapshot = state
        .rides
        .get(&ride_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if !snapshot.involves(caller.id) {
        return Err(AppError::Forbidden(
            "not authorized to cancel this ride".to_string(),
        ));
    }

    let mut details = state
        .driver_details
        .get_mut(&snapshot.driver_id)
        .ok_or_else(|| AppError::Internal("driver details missing for ride".to_string()))?;

    let updated = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

        if ride.status != RideStatus::Scheduled {
            return Err(AppError::Conflict(
                "can only cancel scheduled rides".to_string(),
            ));
        }

        ride.status = RideStatus::Cancelled;
        ride.cancellation_reason = reason;
        ride.clone()
    };

    release_seat(&mut details);
    update_utilization(state, &details);
    drop(details);

    events::on_ride_event(state, RideEvent::Cancelled, &updated);

    tracing::info!(ride_id = %updated.id, "ride cancelled");

    Ok(updated)
}

/// Drive a ride along the one-directional status machine. Terminal
/// transitions (Completed, NoShow) release the driver's seat atomically
/// with the status write.
pub fn update_ride_status(
    state: &AppState,
    caller: &User,
    ride_id: Uuid,
    next: RideStatus,
) -> Result<Ride, AppError> {
    let snapshot = state
        .rides
        .get(&ride_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if snapshot.driver_id != caller.id {
        return Err(AppError::Forbidden(
            "not authorized to update this ride".to_string(),
        ));
    }

    let mut details = state
        .driver_details
        .get_mut(&snapshot.driver_id)
        .ok_or_else(|| AppError::Internal("driver details missing for ride".to_string()))?;

    let updated = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

        if !ride.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "cannot move ride from {:?} to {next:?}",
                ride.status
            )));
        }

        ride.status = next;
        if next == RideStatus::Completed {
            ride.completed_time = Some(Utc::now());
        }
        ride.clone()
    };

    if matches!(next, RideStatus::Completed | RideStatus::NoShow) {
        release_seat(&mut details);
        update_utilization(state, &details);
    }
    drop(details);

    let event = match next {
        RideStatus::PickedUp => RideEvent::PickedUp,
        RideStatus::Completed => RideEvent::Completed,
        RideStatus::NoShow => RideEvent::NoShow,
        _ => unreachable!("transition check admits only forward statuses"),
    };
    events::on_ride_event(state, event, &updated);

    Ok(updated)
}

fn release_seat(details: &mut DriverDetails) {
    details.available_seats = details.clamp_seats(details.available_seats.saturating_add(1));
    details.updated_at = Utc::now();
}

fn update_utilization(state: &AppState, details: &DriverDetails) {
    if details.total_seats == 0 {
        return;
    }

    let booked = details.total_seats.saturating_sub(details.available_seats);
    let utilization = booked as f64 / details.total_seats as f64;
    state
        .metrics
        .driver_seat_utilization
        .with_label_values(&[&details.user_id.to_string()])
        .set(utilization);
}
