use super::Engine;

use crate::{db::Store, error::Error, events::Event};

impl<S: Store> Engine<S> {
    /// Closes every bidding window that lapsed without a winner. Bookings
    /// stay requested and no bid is picked automatically. A booking that
    /// fails to close is logged and left for the next sweep.
    #[tracing::instrument(skip(self))]
    pub async fn expire_bidding_windows(&self) -> Result<usize, Error> {
        let candidates = self.store.expired_booking_ids(self.now()).await?;

        let mut closed = 0;

        for booking_id in candidates {
            let clock = self.clock.clone();

            match self
                .store
                .transact(booking_id, move |ledger| ledger.expire(clock.now()))
                .await
            {
                Ok(Some(expired_bid_ids)) => {
                    closed += 1;

                    tracing::info!(
                        %booking_id,
                        expired = expired_bid_ids.len(),
                        "bidding window expired"
                    );

                    self.publish(Event::BiddingExpired {
                        booking_id,
                        expired_bid_ids,
                    });
                }
                // accepted or cancelled since the scan
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%booking_id, %err, "failed to expire bidding window, retrying next sweep");
                }
            }
        }

        Ok(closed)
    }
}
