use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{bid, Bid, BidStatus, Booking, Coordinates, TrackingRecord};
use crate::error::Error;

/// A booking together with every bid placed on it and, once a winner is
/// chosen, its tracking record. All writes to any of the three go through
/// this aggregate so a store can persist them as one unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingLedger {
    pub booking: Booking,
    pub bids: Vec<Bid>,
    pub tracking: Option<TrackingRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Acceptance {
    pub bid: Bid,
    pub rejected_bid_ids: Vec<Uuid>,
}

impl BookingLedger {
    pub fn new(booking: Booking) -> Self {
        Self {
            booking,
            bids: vec![],
            tracking: None,
        }
    }

    pub fn active_bids(&self) -> Vec<Bid> {
        let mut bids: Vec<Bid> = self.bids.iter().filter(|b| b.is_active()).cloned().collect();
        bids.sort_by(Bid::rank);
        bids
    }

    pub fn lowest_active_amount(&self) -> Option<f64> {
        self.bids
            .iter()
            .filter(|b| b.is_active())
            .map(|b| b.amount)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn has_active_bid_from(&self, driver_id: &Uuid) -> bool {
        self.bids
            .iter()
            .any(|b| b.is_active() && &b.driver_id == driver_id)
    }

    pub fn accepted_bid(&self) -> Option<&Bid> {
        self.bids.iter().find(|b| b.status == BidStatus::Accepted)
    }

    /// Records a new bid; every window check is made against `now`, which
    /// callers read while holding the booking for writing.
    #[tracing::instrument(skip(self), fields(booking_id = %self.booking.id))]
    pub fn place_bid(
        &mut self,
        driver_id: Uuid,
        amount: f64,
        eta_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Bid, Error> {
        bid::validate_offer(amount, eta_minutes)?;

        if !self.booking.accepts_bids_at(now) {
            return Err(Error::conflict_error("bidding is closed for this booking"));
        }

        if self.has_active_bid_from(&driver_id) {
            return Err(Error::conflict_error(
                "driver already holds an active bid on this booking",
            ));
        }

        let expires_at = self
            .booking
            .bidding_end_time
            .ok_or_else(|| Error::unexpected_error("open booking without a deadline"))?;

        let bid = Bid::new(self.booking.id, driver_id, amount, eta_minutes, expires_at, now);
        self.bids.push(bid.clone());

        Ok(bid)
    }

    /// Picks the winning bid. The window is judged at `requested_at`, the
    /// moment the rider's request arrived, while `now` stamps the writes.
    #[tracing::instrument(skip(self), fields(booking_id = %self.booking.id))]
    pub fn accept_bid(
        &mut self,
        bid_id: Uuid,
        requested_at: DateTime<Utc>,
        driver_location: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> Result<Acceptance, Error> {
        if !self.booking.bidding_enabled {
            return Err(Error::conflict_error("bidding is closed for this booking"));
        }

        if !self.booking.accepts_bids_at(requested_at) {
            return Err(Error::conflict_error("bidding window had expired"));
        }

        let index = self
            .bids
            .iter()
            .position(|b| b.id == bid_id)
            .ok_or_else(|| Error::not_found_error("bid not found on this booking"))?;

        if !self.bids[index].is_active() {
            return Err(Error::conflict_error("bid is no longer active"));
        }

        let mut bids = self.bids.clone();
        let mut booking = self.booking.clone();

        booking.assign(bids[index].driver_id, bid_id, now)?;
        bids[index].accept()?;

        let mut rejected_bid_ids = vec![];
        for sibling in bids.iter_mut().filter(|b| b.id != bid_id && b.is_active()) {
            sibling.reject()?;
            rejected_bid_ids.push(sibling.id);
        }

        let winner = bids[index].clone();
        let pickup = booking.pickup.coordinates;
        let tracking = match driver_location {
            Some(location) => TrackingRecord::new(booking.id, location, &pickup, now),
            None => TrackingRecord {
                booking_id: booking.id,
                driver_location: pickup,
                eta_minutes: winner.eta_minutes,
                updated_at: now,
            },
        };

        self.booking = booking;
        self.bids = bids;
        self.tracking = Some(tracking);

        Ok(Acceptance {
            bid: winner,
            rejected_bid_ids,
        })
    }

    /// Closes a lapsed window and expires the bids still standing on it.
    /// Returns `None` when the window had already been closed some other way.
    #[tracing::instrument(skip(self), fields(booking_id = %self.booking.id))]
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<Option<Vec<Uuid>>, Error> {
        if !self.booking.is_expired_at(now) {
            return Ok(None);
        }

        self.booking.close_bidding(now);

        let mut expired = vec![];
        for bid in self.bids.iter_mut().filter(|b| b.is_active()) {
            bid.expire()?;
            expired.push(bid.id);
        }

        Ok(Some(expired))
    }

    /// Cancels the booking and turns away any bid still standing.
    #[tracing::instrument(skip(self), fields(booking_id = %self.booking.id))]
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        self.booking.cancel(now)?;

        let mut rejected = vec![];
        for bid in self.bids.iter_mut().filter(|b| b.is_active()) {
            bid.reject()?;
            rejected.push(bid.id);
        }

        Ok(rejected)
    }

    pub fn refresh_tracking(
        &mut self,
        driver_location: Coordinates,
        now: DateTime<Utc>,
    ) -> Result<TrackingRecord, Error> {
        let pickup = self.booking.pickup.coordinates;
        let tracking = self
            .tracking
            .as_mut()
            .ok_or_else(|| Error::conflict_error("booking has no assigned driver"))?;

        tracking.relocate(driver_location, &pickup, now);

        Ok(tracking.clone())
    }
}
