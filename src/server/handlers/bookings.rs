use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{BookingAPI, DynAPI, Settlement, SettlementAPI};
use crate::auth::User;
use crate::entities::{Booking, BookingRequest, Coordinates, TrackingRecord};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    #[serde(flatten)]
    request: BookingRequest,
    bidding_window_seconds: Option<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct CompleteParams {
    final_price: f64,
}

#[derive(Serialize, Deserialize)]
pub struct TrackingParams {
    coordinates: Coordinates,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<CreateParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api
        .open_bidding(user, params.request, params.bidding_window_seconds)
        .await?;

    Ok(booking.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(user, id).await?;

    Ok(booking.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.cancel_booking(user, id).await?;

    Ok(booking.into())
}

pub async fn mark_picked_up(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.mark_picked_up(user, id).await?;

    Ok(booking.into())
}

pub async fn start_trip(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.start_trip(user, id).await?;

    Ok(booking.into())
}

pub async fn complete(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<CompleteParams>,
) -> Result<Json<Settlement>, Error> {
    let settlement = api.complete_booking(user, id, params.final_price).await?;

    Ok(settlement.into())
}

pub async fn find_tracking(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingRecord>, Error> {
    let tracking = api.find_tracking(user, id).await?;

    Ok(tracking.into())
}

pub async fn refresh_tracking(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<TrackingParams>,
) -> Result<Json<TrackingRecord>, Error> {
    let tracking = api.refresh_tracking(user, id, params.coordinates).await?;

    Ok(tracking.into())
}
