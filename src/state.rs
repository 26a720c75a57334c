use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::AuthMode;
use crate::config::Config;
use crate::error::AppError;
use crate::models::driver::{DriverDetails, DriverVerification};
use crate::models::notification::Notification;
use crate::models::ride::Ride;
use crate::models::user::{User, UserPreferences};
use crate::observability::metrics::Metrics;
use crate::upstream::CivicClient;

/// Shared store. Entities live in per-type maps keyed by id; the
/// `driver_details` entry lock is the serialization point for every
/// seat-count mutation. Lock order across the code base is fixed:
/// driver details first, then the ride.
pub struct AppState {
    pub auth_mode: AuthMode,
    pub identities: DashMap<String, Uuid>,
    pub users: DashMap<Uuid, User>,
    pub driver_details: DashMap<Uuid, DriverDetails>,
    pub verifications: DashMap<Uuid, DriverVerification>,
    pub rides: DashMap<Uuid, Ride>,
    pub notifications: DashMap<Uuid, Notification>,
    pub preferences: DashMap<Uuid, UserPreferences>,
    pub civic: CivicClient,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let metrics = Metrics::new();
        let civic = CivicClient::new(config, metrics.clone());

        Self {
            auth_mode: config.auth_mode,
            identities: DashMap::new(),
            users: DashMap::new(),
            driver_details: DashMap::new(),
            verifications: DashMap::new(),
            rides: DashMap::new(),
            notifications: DashMap::new(),
            preferences: DashMap::new(),
            civic,
            metrics,
        }
    }

    pub fn user_by_identity(&self, clerk_id: &str) -> Option<User> {
        let user_id = *self.identities.get(clerk_id)?;
        self.users.get(&user_id).map(|entry| entry.value().clone())
    }

    /// Resolve the registered user behind an identity, 404 otherwise.
    pub fn require_user(&self, clerk_id: &str) -> Result<User, AppError> {
        self.user_by_identity(clerk_id)
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }
}
