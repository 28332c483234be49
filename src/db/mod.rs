mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{Booking, BookingLedger, Coordinates, Driver};
use crate::error::Error;

/// Persistence capability the engine runs on.
///
/// `transact` is the only way to change a booking, its bids or its tracking
/// record: the store hands `f` the current aggregate while holding the
/// booking exclusively, and persists the result only if `f` returns `Ok`.
/// Writers on the same booking are therefore serialised, and a failed `f`
/// leaves nothing behind.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error>;

    async fn find_ledger(&self, booking_id: Uuid) -> Result<Option<BookingLedger>, Error>;

    /// Bookings still taking bids at `now`, with their bids.
    async fn open_ledgers(&self, now: DateTime<Utc>) -> Result<Vec<BookingLedger>, Error>;

    /// Bookings whose window lapsed before `now` but are still flagged open.
    async fn expired_booking_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error>;

    async fn transact<T, F>(&self, booking_id: Uuid, f: F) -> Result<T, Error>
    where
        T: Send,
        F: FnOnce(&mut BookingLedger) -> Result<T, Error> + Send;

    async fn insert_driver(&self, driver: &Driver) -> Result<(), Error>;

    async fn find_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, Error>;

    async fn update_driver(&self, driver: &Driver) -> Result<(), Error>;

    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        coordinates: Coordinates,
        at: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn find_driver_location(&self, driver_id: Uuid) -> Result<Option<Coordinates>, Error>;
}
