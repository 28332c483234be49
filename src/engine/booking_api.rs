use super::Engine;

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::{
    api::{BookingAPI, BookingSummary},
    auth::{Platform, User},
    db::Store,
    entities::{Booking, BookingRequest, Coordinates},
    error::Error,
    estimator,
    events::Event,
};

#[async_trait]
impl<S: Store> BookingAPI for Engine<S> {
    #[tracing::instrument(skip(self, request))]
    async fn open_bidding(
        &self,
        user: User,
        request: BookingRequest,
        window_seconds: Option<i64>,
    ) -> Result<Booking, Error> {
        self.authorize(user.clone(), "open_bidding", Platform::default())?;

        let window = match window_seconds {
            Some(seconds) if seconds > 0 => Duration::try_seconds(seconds)
                .ok_or_else(|| Error::invalid_request_error("bidding window is too long"))?,
            Some(_) => {
                return Err(Error::invalid_request_error(
                    "bidding window must be positive",
                ))
            }
            None => self.bidding_window,
        };

        let booking = Booking::open(user.id, request, window, self.now())?;

        self.store.insert_booking(&booking).await?;

        tracing::info!(
            booking_id = %booking.id,
            bidding_end_time = ?booking.bidding_end_time,
            "bidding window opened"
        );

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, user: User, id: Uuid) -> Result<Booking, Error> {
        let ledger = self.fetch_ledger(id).await?;

        self.authorize(user.clone(), "read", ledger.booking.clone())?;

        Ok(ledger.booking)
    }

    #[tracing::instrument(skip(self))]
    async fn list_open_for_driver(
        &self,
        user: User,
        driver_id: Uuid,
        location: Coordinates,
    ) -> Result<Vec<BookingSummary>, Error> {
        location.validate()?;

        let driver = self.fetch_driver(driver_id).await?;

        self.authorize(user.clone(), "list_open", driver)?;

        let ledgers = self.store.open_ledgers(self.now()).await?;

        let mut summaries: Vec<BookingSummary> = ledgers
            .into_iter()
            .filter(|ledger| !ledger.has_active_bid_from(&driver_id))
            .map(|ledger| {
                let distance_km = estimator::distance_km(&location, &ledger.booking.pickup.coordinates);

                BookingSummary {
                    distance_km,
                    eta_minutes: estimator::eta_minutes(distance_km),
                    lowest_bid: ledger.lowest_active_amount(),
                    bid_count: ledger.bids.iter().filter(|b| b.is_active()).count(),
                    booking: ledger.booking,
                }
            })
            .collect();

        summaries.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        tracing::info!(count = summaries.len(), "listed open bookings");

        Ok(summaries)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_booking(&self, user: User, id: Uuid) -> Result<Booking, Error> {
        // rider and assigned driver never change once set, so the unlocked
        // read is enough to authorize
        let ledger = self.fetch_ledger(id).await?;

        self.authorize(user.clone(), "cancel", ledger.booking.clone())?;

        let clock = self.clock.clone();
        let (booking, rejected) = self
            .store
            .transact(id, move |ledger| {
                let rejected = ledger.cancel(clock.now())?;
                Ok((ledger.booking.clone(), rejected))
            })
            .await?;

        tracing::info!(booking_id = %id, rejected = rejected.len(), "booking cancelled");

        self.publish(Event::BookingCancelled { booking_id: id });

        if !rejected.is_empty() {
            self.publish(Event::BidsRejected {
                booking_id: id,
                bid_ids: rejected,
            });
        }

        Ok(booking)
    }
}
