mod bid_api;
mod booking_api;
mod driver_api;
mod expiry;
mod settlement_api;


use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use oso::Oso;
use uuid::Uuid;

use crate::{
    api::API,
    auth::authorizor,
    clock::{Clock, SystemClock},
    config::DEFAULT_BIDDING_WINDOW_SECS,
    db::Store,
    entities::{BookingLedger, Driver},
    error::Error,
    events::{Event, EventSink},
};

pub struct Engine<S> {
    store: S,
    authorizor: Oso,
    clock: Arc<dyn Clock>,
    events: EventSink,
    bidding_window: Duration,
    market_offset: FixedOffset,
}

impl<S: Store> Engine<S> {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(store: S, events: EventSink) -> Result<Self, Error> {
        Ok(Self {
            store,
            authorizor: authorizor::new()?,
            clock: Arc::new(SystemClock),
            events,
            bidding_window: Duration::seconds(DEFAULT_BIDDING_WINDOW_SECS),
            market_offset: FixedOffset::east_opt(0)
                .ok_or_else(|| Error::unexpected_error("invalid utc offset"))?,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_bidding_window(mut self, window: Duration) -> Self {
        self.bidding_window = window;
        self
    }

    /// Offset of the market's wall clock, used for commission time buckets.
    pub fn with_market_offset(mut self, offset: FixedOffset) -> Self {
        self.market_offset = offset;
        self
    }
}

impl<S: Store> Engine<S> {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(Error::unauthorized_error())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn publish(&self, event: Event) {
        self.events.publish(event);
    }

    async fn fetch_ledger(&self, booking_id: Uuid) -> Result<BookingLedger, Error> {
        self.store
            .find_ledger(booking_id)
            .await?
            .ok_or_else(|| Error::not_found_error("booking not found"))
    }

    async fn fetch_driver(&self, driver_id: Uuid) -> Result<Driver, Error> {
        self.store
            .find_driver(driver_id)
            .await?
            .ok_or_else(|| Error::not_found_error("driver not found"))
    }
}

impl<S: Store> API for Engine<S> {}
