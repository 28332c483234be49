use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Coordinates;
use crate::estimator;

/// Live position of the assigned driver relative to the pickup point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub booking_id: Uuid,
    pub driver_location: Coordinates,
    pub eta_minutes: i64,
    pub updated_at: DateTime<Utc>,
}

impl TrackingRecord {
    pub fn new(
        booking_id: Uuid,
        driver_location: Coordinates,
        pickup: &Coordinates,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            booking_id,
            driver_location,
            eta_minutes: estimator::eta_minutes(estimator::distance_km(&driver_location, pickup)),
            updated_at,
        }
    }

    pub fn relocate(&mut self, driver_location: Coordinates, pickup: &Coordinates, at: DateTime<Utc>) {
        self.driver_location = driver_location;
        self.eta_minutes = estimator::eta_minutes(estimator::distance_km(&driver_location, pickup));
        self.updated_at = at;
    }
}
