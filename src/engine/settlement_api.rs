use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{SettlementAPI, Settlement},
    auth::User,
    commission,
    db::Store,
    entities::{Booking, BookingStatus, Coordinates, TrackingRecord},
    error::Error,
    events::Event,
};

#[async_trait]
impl<S: Store> SettlementAPI for Engine<S> {
    /// Picks the winning bid. Booking, winner, losing siblings and the new
    /// tracking record are written as one unit or not at all, so among
    /// concurrent calls on one booking at most one succeeds.
    #[tracing::instrument(skip(self))]
    async fn accept_bid(
        &self,
        user: User,
        booking_id: Uuid,
        bid_id: Uuid,
    ) -> Result<Booking, Error> {
        // the window is judged at arrival so that a request made in time
        // is not lost to the latency of getting the lock
        let requested_at = self.now();

        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "accept_bid", ledger.booking.clone())?;

        let bid = ledger
            .bids
            .iter()
            .find(|b| b.id == bid_id)
            .ok_or_else(|| Error::not_found_error("bid not found on this booking"))?;

        let driver_location = self.store.find_driver_location(bid.driver_id).await?;

        let clock = self.clock.clone();
        let (booking, acceptance) = self
            .store
            .transact(booking_id, move |ledger| {
                let acceptance =
                    ledger.accept_bid(bid_id, requested_at, driver_location, clock.now())?;
                Ok((ledger.booking.clone(), acceptance))
            })
            .await
            .map_err(|err| {
                if err.is_conflict_error() {
                    tracing::info!(%booking_id, %bid_id, %err, "accept refused");
                }
                err
            })?;

        tracing::info!(
            %booking_id,
            %bid_id,
            driver_id = %acceptance.bid.driver_id,
            rejected = acceptance.rejected_bid_ids.len(),
            "bid accepted"
        );

        self.publish(Event::BidAccepted {
            booking_id,
            bid_id,
            driver_id: acceptance.bid.driver_id,
        });

        if !acceptance.rejected_bid_ids.is_empty() {
            self.publish(Event::BidsRejected {
                booking_id,
                bid_ids: acceptance.rejected_bid_ids,
            });
        }

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_tracking(&self, user: User, booking_id: Uuid) -> Result<TrackingRecord, Error> {
        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "read", ledger.booking.clone())?;

        ledger
            .tracking
            .ok_or_else(|| Error::not_found_error("booking has no tracking record"))
    }

    /// Moves the tracking record. The driver's last known location is
    /// updated afterwards on a best-effort basis; a failure there is logged
    /// and does not fail the call.
    #[tracing::instrument(skip(self))]
    async fn refresh_tracking(
        &self,
        user: User,
        booking_id: Uuid,
        location: Coordinates,
    ) -> Result<TrackingRecord, Error> {
        location.validate()?;

        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "track", ledger.booking.clone())?;

        let clock = self.clock.clone();
        let tracking = self
            .store
            .transact(booking_id, move |ledger| {
                if ledger.booking.status != BookingStatus::Accepted {
                    return Err(Error::conflict_error("driver is no longer en route"));
                }

                ledger.refresh_tracking(location, clock.now())
            })
            .await?;

        if let Some(driver_id) = ledger.booking.driver_id {
            if let Err(err) = self
                .store
                .update_driver_location(driver_id, location, tracking.updated_at)
                .await
            {
                tracing::warn!(%driver_id, %err, "tracking saved but driver location write failed");
            }
        }

        Ok(tracking)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_picked_up(&self, user: User, booking_id: Uuid) -> Result<Booking, Error> {
        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "progress", ledger.booking.clone())?;

        let clock = self.clock.clone();
        self.store
            .transact(booking_id, move |ledger| {
                ledger.booking.mark_picked_up(clock.now())?;
                Ok(ledger.booking.clone())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn start_trip(&self, user: User, booking_id: Uuid) -> Result<Booking, Error> {
        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "progress", ledger.booking.clone())?;

        let clock = self.clock.clone();
        self.store
            .transact(booking_id, move |ledger| {
                ledger.booking.start_trip(clock.now())?;
                Ok(ledger.booking.clone())
            })
            .await
    }

    /// Closes the trip and attaches the commission resolved from the
    /// driver's rate profile at completion time.
    #[tracing::instrument(skip(self))]
    async fn complete_booking(
        &self,
        user: User,
        booking_id: Uuid,
        final_price: f64,
    ) -> Result<Settlement, Error> {
        if !final_price.is_finite() || final_price <= 0.0 {
            return Err(Error::invalid_request_error("final price must be positive"));
        }

        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "progress", ledger.booking.clone())?;

        let driver_id = ledger
            .booking
            .driver_id
            .ok_or_else(|| Error::conflict_error("booking has no assigned driver"))?;
        let driver = self.fetch_driver(driver_id).await?;

        let clock = self.clock.clone();
        let offset = self.market_offset;
        let settlement = self
            .store
            .transact(booking_id, move |ledger| {
                let now = clock.now();
                let commission = commission::resolve(
                    &driver.rates,
                    final_price,
                    now.with_timezone(&offset).naive_local(),
                    ledger.booking.trip_distance_km(),
                );

                ledger.booking.complete(final_price, &commission, now)?;

                Ok(Settlement {
                    booking: ledger.booking.clone(),
                    commission,
                })
            })
            .await?;

        tracing::info!(
            %booking_id,
            %driver_id,
            applied_rate = settlement.commission.applied_rate,
            commission_amount = settlement.commission.commission_amount,
            "booking settled"
        );

        self.publish(Event::BookingCompleted {
            booking_id,
            driver_id,
            commission_amount: settlement.commission.commission_amount,
        });

        Ok(settlement)
    }
}
