use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{BookingAPI, BookingSummary, DriverAPI, DynAPI};
use crate::auth::User;
use crate::entities::{Coordinates, Driver, DriverRateProfile};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    driver_id: Uuid,
    #[serde(default)]
    rates: DriverRateProfile,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateLocationParams {
    coordinates: Coordinates,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<CreateParams>,
) -> Result<Json<Driver>, Error> {
    let driver = api
        .create_driver(user, params.driver_id, params.rates)
        .await?;

    Ok(driver.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, Error> {
    let driver = api.find_driver(user, id).await?;

    Ok(driver.into())
}

/// `?lat=..&lng=..` is where the driver is now.
pub async fn open_bookings(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Query(location): Query<Coordinates>,
) -> Result<Json<Vec<BookingSummary>>, Error> {
    let summaries = api.list_open_for_driver(user, id, location).await?;

    Ok(summaries.into())
}

pub async fn update_location(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateLocationParams>,
) -> Result<Json<()>, Error> {
    api.update_driver_location(user, id, params.coordinates)
        .await?;

    Ok(().into())
}

pub async fn update_rates(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(rates): Json<DriverRateProfile>,
) -> Result<Json<Driver>, Error> {
    let driver = api.update_driver_rates(user, id, rates).await?;

    Ok(driver.into())
}
