use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::BidAPI,
    auth::User,
    db::Store,
    entities::{validate_offer, Bid},
    error::Error,
    events::Event,
};

#[async_trait]
impl<S: Store> BidAPI for Engine<S> {
    #[tracing::instrument(skip(self))]
    async fn place_bid(
        &self,
        user: User,
        booking_id: Uuid,
        driver_id: Uuid,
        amount: f64,
        eta_minutes: i64,
    ) -> Result<Bid, Error> {
        validate_offer(amount, eta_minutes)?;

        let driver = self.fetch_driver(driver_id).await?;

        self.authorize(user.clone(), "place_bid", driver)?;

        // the window is re-checked against the clock only once the booking
        // is held for writing
        let clock = self.clock.clone();
        let bid = self
            .store
            .transact(booking_id, move |ledger| {
                ledger.place_bid(driver_id, amount, eta_minutes, clock.now())
            })
            .await
            .map_err(|err| {
                if err.is_conflict_error() {
                    tracing::info!(%booking_id, %driver_id, %err, "bid refused");
                }
                err
            })?;

        tracing::info!(bid_id = %bid.id, %booking_id, %driver_id, "bid placed");

        self.publish(Event::BidPlaced {
            booking_id,
            bid_id: bid.id,
            driver_id,
            amount,
        });

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn list_active_bids(&self, user: User, booking_id: Uuid) -> Result<Vec<Bid>, Error> {
        let ledger = self.fetch_ledger(booking_id).await?;

        self.authorize(user.clone(), "list_bids", ledger.booking.clone())?;

        Ok(ledger.active_bids())
    }
}
