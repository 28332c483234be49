use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::User;
use crate::commission::Commission;
use crate::entities::{
    Bid, Booking, BookingRequest, Coordinates, Driver, DriverRateProfile, TrackingRecord,
};
use crate::error::Error;

/// An open request as a nearby driver sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub booking: Booking,
    pub distance_km: f64,
    pub eta_minutes: i64,
    pub lowest_bid: Option<f64>,
    pub bid_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub booking: Booking,
    pub commission: Commission,
}

#[async_trait]
pub trait BookingAPI {
    /// Posts a ride request and opens its bidding window. `window_seconds`
    /// falls back to the configured default.
    async fn open_bidding(
        &self,
        user: User,
        request: BookingRequest,
        window_seconds: Option<i64>,
    ) -> Result<Booking, Error>;

    async fn find_booking(&self, user: User, id: Uuid) -> Result<Booking, Error>;

    /// Requests still taking bids that `driver_id` has not bid on, nearest
    /// pickup first.
    async fn list_open_for_driver(
        &self,
        user: User,
        driver_id: Uuid,
        location: Coordinates,
    ) -> Result<Vec<BookingSummary>, Error>;

    async fn cancel_booking(&self, user: User, id: Uuid) -> Result<Booking, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn place_bid(
        &self,
        user: User,
        booking_id: Uuid,
        driver_id: Uuid,
        amount: f64,
        eta_minutes: i64,
    ) -> Result<Bid, Error>;

    /// Standing bids, cheapest first and faster arrival on equal price.
    async fn list_active_bids(&self, user: User, booking_id: Uuid) -> Result<Vec<Bid>, Error>;
}

#[async_trait]
pub trait SettlementAPI {
    async fn accept_bid(&self, user: User, booking_id: Uuid, bid_id: Uuid)
        -> Result<Booking, Error>;

    async fn find_tracking(&self, user: User, booking_id: Uuid) -> Result<TrackingRecord, Error>;

    async fn refresh_tracking(
        &self,
        user: User,
        booking_id: Uuid,
        location: Coordinates,
    ) -> Result<TrackingRecord, Error>;

    async fn mark_picked_up(&self, user: User, booking_id: Uuid) -> Result<Booking, Error>;

    async fn start_trip(&self, user: User, booking_id: Uuid) -> Result<Booking, Error>;

    async fn complete_booking(
        &self,
        user: User,
        booking_id: Uuid,
        final_price: f64,
    ) -> Result<Settlement, Error>;
}

#[async_trait]
pub trait DriverAPI {
    async fn create_driver(
        &self,
        user: User,
        driver_id: Uuid,
        rates: DriverRateProfile,
    ) -> Result<Driver, Error>;

    async fn find_driver(&self, user: User, id: Uuid) -> Result<Driver, Error>;

    async fn update_driver_location(
        &self,
        user: User,
        id: Uuid,
        location: Coordinates,
    ) -> Result<(), Error>;

    async fn update_driver_rates(
        &self,
        user: User,
        id: Uuid,
        rates: DriverRateProfile,
    ) -> Result<Driver, Error>;
}

pub trait API: BookingAPI + BidAPI + SettlementAPI + DriverAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
