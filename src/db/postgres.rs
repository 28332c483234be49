use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use geo_types::Geometry;
use geozero::wkb;
use sqlx::{postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::Store;
use crate::entities::{Bid, Booking, BookingLedger, Coordinates, Driver, TrackingRecord};
use crate::error::Error;

type Database = Postgres;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: Pool<Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip_all)]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        pool.execute("CREATE EXTENSION IF NOT EXISTS postgis").await?;

        pool.execute("CREATE TABLE IF NOT EXISTS bookings (id UUID PRIMARY KEY, rider_id UUID NOT NULL, status VARCHAR NOT NULL, bidding_enabled BOOLEAN NOT NULL, bidding_end_time TIMESTAMPTZ, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS bookings_open_window ON bookings (bidding_end_time) WHERE bidding_enabled")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS bids (id UUID PRIMARY KEY, booking_id UUID NOT NULL, driver_id UUID NOT NULL, status VARCHAR NOT NULL, data JSONB NOT NULL, CONSTRAINT fk_bid_booking FOREIGN KEY(booking_id) REFERENCES bookings(id))")
            .await?;
        pool.execute("CREATE UNIQUE INDEX IF NOT EXISTS bids_one_active_per_driver ON bids (booking_id, driver_id) WHERE status = 'active'")
            .await?;
        pool.execute("CREATE UNIQUE INDEX IF NOT EXISTS bids_one_accepted_per_booking ON bids (booking_id) WHERE status = 'accepted'")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS tracking (booking_id UUID PRIMARY KEY, data JSONB NOT NULL, CONSTRAINT fk_tracking_booking FOREIGN KEY(booking_id) REFERENCES bookings(id))")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS drivers (id UUID PRIMARY KEY, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS driver_locations (driver_id UUID PRIMARY KEY, location geometry(Point, 4326) NOT NULL, updated_at TIMESTAMPTZ NOT NULL)")
            .await?;

        Ok(Self { pool })
    }
}

fn conflict_on_unique_violation(err: sqlx::Error, message: &str) -> Error {
    let unique_violation = err
        .as_database_error()
        .and_then(|e| e.code())
        .map_or(false, |code| code == UNIQUE_VIOLATION);

    if unique_violation {
        return Error::conflict_error(message);
    }

    err.into()
}

#[tracing::instrument(skip(tx))]
async fn fetch_ledger(
    tx: &mut Transaction<'_, Database>,
    booking_id: &Uuid,
    for_update: bool,
) -> Result<Option<BookingLedger>, Error> {
    // the booking row lock is what serialises writers on one booking
    let query = match for_update {
        true => "SELECT data FROM bookings WHERE id = $1 FOR UPDATE",
        false => "SELECT data FROM bookings WHERE id = $1",
    };

    let maybe_row = (&mut *tx)
        .fetch_optional(sqlx::query(query).bind(booking_id))
        .await?;

    let Json(booking): Json<Booking> = match maybe_row {
        Some(row) => row.try_get("data")?,
        None => return Ok(None),
    };

    let mut bids = vec![];
    {
        let mut rows = (&mut *tx).fetch(
            sqlx::query("SELECT data FROM bids WHERE booking_id = $1 ORDER BY data->>'created_at'")
                .bind(booking_id),
        );

        while let Some(row) = rows.try_next().await? {
            let Json(bid): Json<Bid> = row.try_get("data")?;
            bids.push(bid);
        }
    }

    let tracking = match (&mut *tx)
        .fetch_optional(sqlx::query("SELECT data FROM tracking WHERE booking_id = $1").bind(booking_id))
        .await?
    {
        Some(row) => {
            let Json(tracking): Json<TrackingRecord> = row.try_get("data")?;
            Some(tracking)
        }
        None => None,
    };

    Ok(Some(BookingLedger {
        booking,
        bids,
        tracking,
    }))
}

#[tracing::instrument(skip_all, fields(booking_id = %after.booking.id))]
async fn write_ledger_changes(
    tx: &mut Transaction<'_, Database>,
    before: &BookingLedger,
    after: &BookingLedger,
) -> Result<(), Error> {
    if before.booking != after.booking {
        let booking = &after.booking;

        (&mut *tx).execute(
            sqlx::query("UPDATE bookings SET status = $2, bidding_enabled = $3, bidding_end_time = $4, data = $5 WHERE id = $1")
                .bind(&booking.id)
                .bind(booking.status.name())
                .bind(booking.bidding_enabled)
                .bind(booking.bidding_end_time)
                .bind(Json(booking)),
        )
        .await?;
    }

    for bid in after.bids.iter() {
        if before.bids.iter().any(|b| b == bid) {
            continue;
        }

        (&mut *tx).execute(
            sqlx::query("INSERT INTO bids (id, booking_id, driver_id, status, data) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, data = EXCLUDED.data")
                .bind(&bid.id)
                .bind(&bid.booking_id)
                .bind(&bid.driver_id)
                .bind(bid.status.name())
                .bind(Json(bid)),
        )
        .await
        .map_err(|e| conflict_on_unique_violation(e, "bid conflicts with an existing bid"))?;
    }

    if before.tracking != after.tracking {
        if let Some(tracking) = &after.tracking {
            (&mut *tx).execute(
                sqlx::query("INSERT INTO tracking (booking_id, data) VALUES ($1, $2) ON CONFLICT (booking_id) DO UPDATE SET data = EXCLUDED.data")
                    .bind(&tracking.booking_id)
                    .bind(Json(tracking)),
            )
            .await?;
        }
    }

    Ok(())
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip_all, fields(booking_id = %booking.id))]
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO bookings (id, rider_id, status, bidding_enabled, bidding_end_time, data) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(&booking.id)
                .bind(&booking.rider_id)
                .bind(booking.status.name())
                .bind(booking.bidding_enabled)
                .bind(booking.bidding_end_time)
                .bind(Json(booking)),
        )
        .await
        .map_err(|e| conflict_on_unique_violation(e, "booking already exists"))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_ledger(&self, booking_id: Uuid) -> Result<Option<BookingLedger>, Error> {
        let mut tx = self.pool.begin().await?;
        tx.execute("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .await?;

        let ledger = fetch_ledger(&mut tx, &booking_id, false).await?;

        tx.rollback().await?;

        Ok(ledger)
    }

    #[tracing::instrument(skip(self))]
    async fn open_ledgers(&self, now: DateTime<Utc>) -> Result<Vec<BookingLedger>, Error> {
        let mut conn = self.pool.acquire().await?;

        let mut bookings = vec![];
        {
            let mut rows = conn.fetch(
                sqlx::query("SELECT data FROM bookings WHERE status = 'requested' AND bidding_enabled AND bidding_end_time > $1")
                    .bind(now),
            );

            while let Some(row) = rows.try_next().await? {
                let Json(booking): Json<Booking> = row.try_get("data")?;
                bookings.push(booking);
            }
        }

        let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let mut bids_by_booking: HashMap<Uuid, Vec<Bid>> = HashMap::new();
        {
            let mut rows = conn.fetch(
                sqlx::query("SELECT data FROM bids WHERE booking_id = ANY($1)").bind(&ids),
            );

            while let Some(row) = rows.try_next().await? {
                let Json(bid): Json<Bid> = row.try_get("data")?;
                bids_by_booking.entry(bid.booking_id).or_default().push(bid);
            }
        }

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let bids = bids_by_booking.remove(&booking.id).unwrap_or_default();
                BookingLedger {
                    booking,
                    bids,
                    tracking: None,
                }
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn expired_booking_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(
                sqlx::query("SELECT id FROM bookings WHERE bidding_enabled AND bidding_end_time < $1")
                    .bind(now),
            )
            .await?;

        let mut ids = vec![];
        for row in rows.iter() {
            let id: Uuid = row.try_get("id")?;
            ids.push(id);
        }

        Ok(ids)
    }

    #[tracing::instrument(skip(self, f))]
    async fn transact<T, F>(&self, booking_id: Uuid, f: F) -> Result<T, Error>
    where
        T: Send,
        F: FnOnce(&mut BookingLedger) -> Result<T, Error> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let before = match fetch_ledger(&mut tx, &booking_id, true).await? {
            Some(ledger) => ledger,
            None => {
                tx.rollback().await?;
                return Err(Error::not_found_error("booking not found"));
            }
        };

        let mut after = before.clone();

        let output = match f(&mut after) {
            Ok(output) => output,
            Err(err) => {
                tx.rollback().await?;
                return Err(err);
            }
        };

        write_ledger_changes(&mut tx, &before, &after).await?;

        tx.commit().await?;

        Ok(output)
    }

    #[tracing::instrument(skip_all, fields(driver_id = %driver.id))]
    async fn insert_driver(&self, driver: &Driver) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO drivers (id, data) VALUES ($1, $2)")
                .bind(&driver.id)
                .bind(Json(driver)),
        )
        .await
        .map_err(|e| conflict_on_unique_violation(e, "driver already exists"))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(sqlx::query("SELECT data FROM drivers WHERE id = $1").bind(&driver_id))
            .await?;

        match maybe_row {
            Some(row) => {
                let Json(driver): Json<Driver> = row.try_get("data")?;
                Ok(Some(driver))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all, fields(driver_id = %driver.id))]
    async fn update_driver(&self, driver: &Driver) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query("UPDATE drivers SET data = $2 WHERE id = $1")
                    .bind(&driver.id)
                    .bind(Json(driver)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found_error("driver not found"));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        coordinates: Coordinates,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        let location: Geometry<f64> = coordinates.into();

        conn.execute(
            sqlx::query(
                "INSERT INTO driver_locations (driver_id, location, updated_at) VALUES ($1, ST_SetSRID($2, 4326), $3) ON CONFLICT (driver_id) DO UPDATE SET location = EXCLUDED.location, updated_at = EXCLUDED.updated_at",
            )
            .bind(&driver_id)
            .bind(wkb::Encode(location))
            .bind(at),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_driver_location(&self, driver_id: Uuid) -> Result<Option<Coordinates>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT ST_Y(location) AS lat, ST_X(location) AS lng FROM driver_locations WHERE driver_id = $1")
                    .bind(&driver_id),
            )
            .await?;

        match maybe_row {
            Some(row) => Ok(Some(Coordinates {
                lat: row.try_get("lat")?,
                lng: row.try_get("lng")?,
            })),
            None => Ok(None),
        }
    }
}
