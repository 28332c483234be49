use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{BidAPI, DynAPI, SettlementAPI};
use crate::auth::User;
use crate::entities::{Bid, Booking};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    driver_id: Uuid,
    amount: f64,
    eta_minutes: i64,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(booking_id): Path<Uuid>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Bid>, Error> {
    let bid = api
        .place_bid(
            user,
            booking_id,
            params.driver_id,
            params.amount,
            params.eta_minutes,
        )
        .await?;

    Ok(bid.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, Error> {
    let bids = api.list_active_bids(user, booking_id).await?;

    Ok(bids.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path((booking_id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Booking>, Error> {
    let booking = api.accept_bid(user, booking_id, bid_id).await?;

    Ok(booking.into())
}
