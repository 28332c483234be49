mod handlers;

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequest, RequestParts},
    routing::{get, patch, post},
    Router,
};
use uuid::Uuid;

use crate::server::handlers::{bids, bookings, drivers};
use crate::{api::DynAPI, auth::User, error::Error};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/bookings", post(bookings::create))
        .route("/bookings/:id", get(bookings::find))
        .route("/bookings/:id/cancel", patch(bookings::cancel))
        .route("/bookings/:id/pickup", patch(bookings::mark_picked_up))
        .route("/bookings/:id/start", patch(bookings::start_trip))
        .route("/bookings/:id/complete", patch(bookings::complete))
        .route(
            "/bookings/:id/tracking",
            get(bookings::find_tracking).patch(bookings::refresh_tracking),
        )
        .route("/bookings/:id/bids", get(bids::list).post(bids::create))
        .route("/bookings/:id/bids/:bid_id/accept", patch(bids::accept))
        .route("/drivers", post(drivers::create))
        .route("/drivers/:id", get(drivers::find))
        .route("/drivers/:id/open_bookings", get(drivers::open_bookings))
        .route("/drivers/:id/location", patch(drivers::update_location))
        .route("/drivers/:id/rates", patch(drivers::update_rates))
        .layer(Extension(api))
}

pub async fn serve(api: DynAPI, addr: SocketAddr) -> Result<(), Error> {
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| Error::unexpected_error(format!("server error: {}", err)))
}

/// Callers arrive already authenticated; the gateway forwards who they are
/// in headers.
#[async_trait]
impl<B: Send> FromRequest<B> for User {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let headers = req.headers();

        let id = headers
            .get(USER_ID_HEADER)
            .ok_or_else(Error::unauthorized_error)?
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| Error::invalid_request_error("malformed user id header"))?;

        let roles = match headers.get(USER_ROLES_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| Error::invalid_request_error("malformed user roles header"))?
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(String::from)
                .collect(),
            None => vec![],
        };

        Ok(User { id, roles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::Request;

    #[tokio::test]
    async fn user_from_headers() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLES_HEADER, "rider, operator")
            .body(())
            .unwrap();

        let user = User::from_request(&mut RequestParts::new(request))
            .await
            .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.roles, vec!["rider".to_string(), "operator".to_string()]);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();

        let err = User::from_request(&mut RequestParts::new(request))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized_error());

        let request = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();

        let err = User::from_request(&mut RequestParts::new(request))
            .await
            .unwrap_err();
        assert!(err.is_invalid_request_error());
    }
}
