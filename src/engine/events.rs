use chrono::Utc;
use uuid::Uuid;

use crate::models::notification::Notification;
use crate::models::ride::Ride;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideEvent {
    Booked,
    Cancelled,
    PickedUp,
    Completed,
    NoShow,
    Rated,
}

impl RideEvent {
    fn label(self) -> &'static str {
        match self {
            RideEvent::Booked => "booked",
            RideEvent::Cancelled => "cancelled",
            RideEvent::PickedUp => "picked_up",
            RideEvent::Completed => "completed",
            RideEvent::NoShow => "no_show",
            RideEvent::Rated => "rated",
        }
    }
}

/// Single hook fired on every ride transition. Notification fan-out per
/// event lives here, so rewiring who hears about what is a local edit.
pub fn on_ride_event(state: &AppState, event: RideEvent, ride: &Ride) {
    state
        .metrics
        .ride_events_total
        .with_label_values(&[event.label()])
        .inc();

    match event {
        RideEvent::Booked => notify(
            state,
            ride.driver_id,
            "New ride scheduled",
            &format!("A rider booked a seat for {}.", ride.pickup_time),
        ),
        RideEvent::Cancelled => {
            notify(
                state,
                ride.rider_id,
                "Ride cancelled",
                "Your scheduled ride was cancelled.",
            );
            notify(
                state,
                ride.driver_id,
                "Ride cancelled",
                "A scheduled ride was cancelled and the seat is free again.",
            );
        }
        RideEvent::PickedUp => notify(
            state,
            ride.rider_id,
            "Ride started",
            "Your driver marked you as picked up.",
        ),
        RideEvent::Completed => notify(
            state,
            ride.rider_id,
            "Ride completed",
            "You arrived at your polling location.",
        ),
        RideEvent::NoShow => notify(
            state,
            ride.rider_id,
            "Marked as no-show",
            "Your driver reported a no-show for this ride.",
        ),
        RideEvent::Rated => notify(
            state,
            ride.driver_id,
            "New rating received",
            "A rider rated one of your completed rides.",
        ),
    }
}

/// Notifications are created by service actions only, never directly by
/// end users.
pub fn notify(state: &AppState, user_id: Uuid, title: &str, message: &str) {
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id,
        title: title.to_string(),
        message: message.to_string(),
        read: false,
        created_at: Utc::now(),
    };

    state.notifications.insert(notification.id, notification);
}
