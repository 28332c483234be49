use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Store;
use crate::entities::{Booking, BookingLedger, Coordinates, Driver};
use crate::error::Error;

/// Process-local store. Each booking aggregate sits behind its own lock, so
/// writers on one booking queue up while other bookings proceed.
#[derive(Default)]
pub struct MemoryStore {
    bookings: Mutex<HashMap<Uuid, Arc<Mutex<BookingLedger>>>>,
    drivers: Mutex<HashMap<Uuid, Driver>>,
    locations: Mutex<HashMap<Uuid, (Coordinates, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ledgers(&self) -> Vec<Arc<Mutex<BookingLedger>>> {
        self.bookings.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut bookings = self.bookings.lock().await;

        if bookings.contains_key(&booking.id) {
            return Err(Error::conflict_error("booking already exists"));
        }

        bookings.insert(
            booking.id,
            Arc::new(Mutex::new(BookingLedger::new(booking.clone()))),
        );

        Ok(())
    }

    async fn find_ledger(&self, booking_id: Uuid) -> Result<Option<BookingLedger>, Error> {
        let entry = self.bookings.lock().await.get(&booking_id).cloned();

        match entry {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn open_ledgers(&self, now: DateTime<Utc>) -> Result<Vec<BookingLedger>, Error> {
        let mut open = vec![];

        for entry in self.ledgers().await {
            let ledger = entry.lock().await;
            if ledger.booking.accepts_bids_at(now) {
                open.push(ledger.clone());
            }
        }

        Ok(open)
    }

    async fn expired_booking_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        let mut expired = vec![];

        for entry in self.ledgers().await {
            let ledger = entry.lock().await;
            if ledger.booking.is_expired_at(now) {
                expired.push(ledger.booking.id);
            }
        }

        Ok(expired)
    }

    async fn transact<T, F>(&self, booking_id: Uuid, f: F) -> Result<T, Error>
    where
        T: Send,
        F: FnOnce(&mut BookingLedger) -> Result<T, Error> + Send,
    {
        let entry = self
            .bookings
            .lock()
            .await
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| Error::not_found_error("booking not found"))?;

        let mut stored = entry.lock().await;
        let mut working = stored.clone();

        let output = f(&mut working)?;
        *stored = working;

        Ok(output)
    }

    async fn insert_driver(&self, driver: &Driver) -> Result<(), Error> {
        let mut drivers = self.drivers.lock().await;

        if drivers.contains_key(&driver.id) {
            return Err(Error::conflict_error("driver already exists"));
        }

        drivers.insert(driver.id, driver.clone());

        Ok(())
    }

    async fn find_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, Error> {
        Ok(self.drivers.lock().await.get(&driver_id).cloned())
    }

    async fn update_driver(&self, driver: &Driver) -> Result<(), Error> {
        match self.drivers.lock().await.get_mut(&driver.id) {
            Some(stored) => {
                *stored = driver.clone();
                Ok(())
            }
            None => Err(Error::not_found_error("driver not found")),
        }
    }

    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        coordinates: Coordinates,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.locations
            .lock()
            .await
            .insert(driver_id, (coordinates, at));

        Ok(())
    }

    async fn find_driver_location(&self, driver_id: Uuid) -> Result<Option<Coordinates>, Error> {
        Ok(self
            .locations
            .lock()
            .await
            .get(&driver_id)
            .map(|(coordinates, _)| *coordinates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BookingRequest, Place};
    use chrono::Duration;

    fn booking(now: DateTime<Utc>) -> Booking {
        let request = BookingRequest {
            pickup: Place::new(Coordinates::new(12.9716, 77.5946), "MG Road"),
            drop: None,
            vehicle_class: "auto".into(),
            estimated_price: 120.0,
        };

        Booking::open(Uuid::new_v4(), request, Duration::seconds(60), now).unwrap()
    }

    #[tokio::test]
    async fn failed_transaction_leaves_no_trace() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let booking = booking(now);
        store.insert_booking(&booking).await.unwrap();

        let result: Result<(), Error> = store
            .transact(booking.id, |ledger| {
                ledger.place_bid(Uuid::new_v4(), 100.0, 5, now)?;
                Err(Error::conflict_error("changed my mind"))
            })
            .await;
        assert!(result.is_err());

        let ledger = store.find_ledger(booking.id).await.unwrap().unwrap();
        assert!(ledger.bids.is_empty());
    }

    #[tokio::test]
    async fn transact_on_unknown_booking() {
        let store = MemoryStore::new();

        let err = store
            .transact(Uuid::new_v4(), |_| Ok(()))
            .await
            .unwrap_err();

        assert!(err.is_not_found_error());
    }

    #[tokio::test]
    async fn open_and_expired_queries() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let booking = booking(now);
        store.insert_booking(&booking).await.unwrap();

        assert_eq!(store.open_ledgers(now).await.unwrap().len(), 1);
        assert!(store.expired_booking_ids(now).await.unwrap().is_empty());

        let later = now + Duration::seconds(61);
        assert!(store.open_ledgers(later).await.unwrap().is_empty());
        assert_eq!(
            store.expired_booking_ids(later).await.unwrap(),
            vec![booking.id]
        );
    }
}
