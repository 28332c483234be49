use chrono::{DateTime, Duration, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commission::Commission;
use crate::entities::Place;
use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub pickup: Place,
    pub drop: Option<Place>,
    pub vehicle_class: String,
    pub estimated_price: f64,
    pub final_price: Option<f64>,
    pub status: Status,
    pub bidding_enabled: bool,
    pub bidding_end_time: Option<DateTime<Utc>>,
    pub driver_id: Option<Uuid>,
    pub winning_bid_id: Option<Uuid>,
    pub commission_rate: Option<f64>,
    pub commission_amount: Option<f64>,
    pub driver_earnings: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Requested,
    Accepted,
    PickedUp,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Requested => "requested".into(),
            Self::Accepted => "accepted".into(),
            Self::PickedUp => "picked_up".into(),
            Self::InProgress => "in_progress".into(),
            Self::Completed => "completed".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }
}

/// What a rider supplies when posting a ride request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingRequest {
    pub pickup: Place,
    pub drop: Option<Place>,
    pub vehicle_class: String,
    pub estimated_price: f64,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<(), Error> {
        self.pickup.coordinates.validate()?;

        if let Some(drop) = &self.drop {
            drop.coordinates.validate()?;
        }

        if self.vehicle_class.trim().is_empty() {
            return Err(Error::invalid_request_error("vehicle class is required"));
        }

        if !self.estimated_price.is_finite() || self.estimated_price < 0.0 {
            return Err(Error::invalid_request_error(
                "estimated price must be a non-negative number",
            ));
        }

        Ok(())
    }
}

impl Booking {
    /// Posts a ride request with a bidding window closing `window` after `now`.
    pub fn open(
        rider_id: Uuid,
        request: BookingRequest,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        request.validate()?;

        if window <= Duration::zero() {
            return Err(Error::invalid_request_error(
                "bidding window must be positive",
            ));
        }

        let bidding_end_time = now
            .checked_add_signed(window)
            .ok_or_else(|| Error::invalid_request_error("bidding window is too long"))?;

        Ok(Self {
            id: Uuid::new_v4(),
            rider_id,
            pickup: request.pickup,
            drop: request.drop,
            vehicle_class: request.vehicle_class.trim().to_string(),
            estimated_price: request.estimated_price,
            final_price: None,
            status: Status::Requested,
            bidding_enabled: true,
            bidding_end_time: Some(bidding_end_time),
            driver_id: None,
            winning_bid_id: None,
            commission_rate: None,
            commission_amount: None,
            driver_earnings: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// True while bids may still be placed at `at`.
    pub fn accepts_bids_at(&self, at: DateTime<Utc>) -> bool {
        self.status == Status::Requested
            && self.bidding_enabled
            && self.bidding_end_time.map_or(false, |end| at < end)
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.bidding_enabled && self.bidding_end_time.map_or(false, |end| end < at)
    }

    pub fn is_assigned_to(&self, driver_id: &Uuid) -> bool {
        self.driver_id.as_ref() == Some(driver_id)
    }

    pub fn trip_distance_km(&self) -> Option<f64> {
        self.drop
            .as_ref()
            .map(|drop| crate::estimator::distance_km(&self.pickup.coordinates, &drop.coordinates))
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn assign(&mut self, driver_id: Uuid, bid_id: Uuid, at: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Requested => {
                self.driver_id = Some(driver_id);
                self.winning_bid_id = Some(bid_id);
                self.status = Status::Accepted;
                self.bidding_enabled = false;
                self.bidding_end_time = None;
                self.updated_at = at;
                Ok(())
            }
            _ => Err(Error::conflict_error("booking is no longer requested")),
        }
    }

    pub fn close_bidding(&mut self, at: DateTime<Utc>) {
        self.bidding_enabled = false;
        self.updated_at = at;
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn mark_picked_up(&mut self, at: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Accepted => {
                self.status = Status::PickedUp;
                self.updated_at = at;
                Ok(())
            }
            _ => Err(Error::conflict_error("booking is not awaiting pickup")),
        }
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn start_trip(&mut self, at: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::PickedUp => {
                self.status = Status::InProgress;
                self.updated_at = at;
                Ok(())
            }
            _ => Err(Error::conflict_error("rider has not been picked up")),
        }
    }

    #[tracing::instrument(skip(self, commission), fields(booking_id = %self.id))]
    pub fn complete(
        &mut self,
        final_price: f64,
        commission: &Commission,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        match self.status {
            Status::InProgress => {
                self.status = Status::Completed;
                self.final_price = Some(final_price);
                self.commission_rate = Some(commission.applied_rate);
                self.commission_amount = Some(commission.commission_amount);
                self.driver_earnings = Some(commission.driver_earnings);
                self.updated_at = at;
                Ok(())
            }
            _ => Err(Error::conflict_error("trip is not in progress")),
        }
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Completed | Status::Cancelled => {
                Err(Error::conflict_error("booking is already finished"))
            }
            _ => {
                self.status = Status::Cancelled;
                self.bidding_enabled = false;
                self.bidding_end_time = None;
                self.updated_at = at;
                Ok(())
            }
        }
    }
}

impl PolarClass for Booking {
    fn get_polar_class_builder() -> oso::ClassBuilder<Booking> {
        oso::Class::builder()
            .name("Booking")
            .add_attribute_getter("id", |recv: &Booking| recv.id.to_string())
            .add_attribute_getter("rider_id", |recv: &Booking| recv.rider_id.to_string())
            .add_attribute_getter("driver_id", |recv: &Booking| {
                recv.driver_id.map(|id| id.to_string()).unwrap_or_default()
            })
            .add_attribute_getter("status", |recv: &Booking| recv.status.name())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Booking::get_polar_class_builder();
        builder.build()
    }
}

#[cfg(test)]
pub(crate) fn test_request() -> BookingRequest {
    use crate::entities::Coordinates;

    BookingRequest {
        pickup: Place::new(Coordinates::new(12.9716, 77.5946), "MG Road"),
        drop: Some(Place::new(Coordinates::new(12.9352, 77.6245), "Koramangala")),
        vehicle_class: "sedan".into(),
        estimated_price: 300.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Coordinates;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-05T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn open_sets_bidding_window() {
        let booking = Booking::open(Uuid::new_v4(), test_request(), Duration::seconds(300), now())
            .unwrap();

        assert_eq!(booking.status, Status::Requested);
        assert!(booking.bidding_enabled);
        assert_eq!(booking.bidding_end_time, Some(now() + Duration::seconds(300)));
        assert!(booking.driver_id.is_none());
        assert!(booking.winning_bid_id.is_none());
    }

    #[test]
    fn open_rejects_missing_vehicle_class() {
        let mut request = test_request();
        request.vehicle_class = "  ".into();

        let err = Booking::open(Uuid::new_v4(), request, Duration::seconds(300), now())
            .unwrap_err();
        assert!(err.is_invalid_request_error());
    }

    #[test]
    fn open_rejects_bad_pickup_and_window() {
        let mut request = test_request();
        request.pickup.coordinates = Coordinates::new(120.0, 0.0);
        let err = Booking::open(Uuid::new_v4(), request, Duration::seconds(300), now())
            .unwrap_err();
        assert!(err.is_invalid_request_error());

        let err = Booking::open(Uuid::new_v4(), test_request(), Duration::zero(), now())
            .unwrap_err();
        assert!(err.is_invalid_request_error());
    }

    #[test]
    fn open_rejects_window_past_representable_time() {
        let window = Duration::seconds(1_000_000_000_000_000);

        let err = Booking::open(Uuid::new_v4(), test_request(), window, now()).unwrap_err();
        assert!(err.is_invalid_request_error());
    }

    #[test]
    fn window_boundaries() {
        let booking = Booking::open(Uuid::new_v4(), test_request(), Duration::seconds(300), now())
            .unwrap();
        let end = booking.bidding_end_time.unwrap();
        let eps = Duration::milliseconds(1);

        assert!(booking.accepts_bids_at(end - eps));
        assert!(!booking.accepts_bids_at(end));
        assert!(!booking.accepts_bids_at(end + eps));

        assert!(!booking.is_expired_at(end));
        assert!(booking.is_expired_at(end + eps));
    }

    #[test]
    fn trip_progression() {
        let mut booking =
            Booking::open(Uuid::new_v4(), test_request(), Duration::seconds(300), now()).unwrap();

        assert!(booking.mark_picked_up(now()).unwrap_err().is_conflict_error());

        booking.assign(Uuid::new_v4(), Uuid::new_v4(), now()).unwrap();
        assert!(!booking.bidding_enabled);
        assert!(booking.bidding_end_time.is_none());
        assert!(booking.assign(Uuid::new_v4(), Uuid::new_v4(), now()).is_err());

        assert!(booking.start_trip(now()).unwrap_err().is_conflict_error());
        booking.mark_picked_up(now()).unwrap();
        booking.start_trip(now()).unwrap();
        assert_eq!(booking.status, Status::InProgress);

        booking.cancel(now()).unwrap();
        assert_eq!(booking.status, Status::Cancelled);
        assert!(booking.cancel(now()).unwrap_err().is_conflict_error());
    }
}
