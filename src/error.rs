use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

const ENV_VAR_ERROR: i32 = 1;
const DATABASE_ERROR: i32 = 2;
const AUTHORIZATION_ENGINE_ERROR: i32 = 3;
const CONFIG_ERROR: i32 = 4;
const UNEXPECTED_ERROR: i32 = 5;

const INVALID_REQUEST_ERROR: i32 = 100;
const NOT_FOUND_ERROR: i32 = 101;
const CONFLICT_ERROR: i32 = 102;
const UNAUTHORIZED_ERROR: i32 = 103;

impl Error {
    pub fn invalid_request_error(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_REQUEST_ERROR,
            message: message.into(),
        }
    }

    pub fn not_found_error(message: impl Into<String>) -> Self {
        Self {
            code: NOT_FOUND_ERROR,
            message: message.into(),
        }
    }

    pub fn conflict_error(message: impl Into<String>) -> Self {
        Self {
            code: CONFLICT_ERROR,
            message: message.into(),
        }
    }

    pub fn unauthorized_error() -> Self {
        Self {
            code: UNAUTHORIZED_ERROR,
            message: "unauthorized".into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self {
            code: CONFIG_ERROR,
            message: message.into(),
        }
    }

    pub fn unexpected_error(message: impl Into<String>) -> Self {
        Self {
            code: UNEXPECTED_ERROR,
            message: message.into(),
        }
    }

    pub fn is_invalid_request_error(&self) -> bool {
        self.code == INVALID_REQUEST_ERROR
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == NOT_FOUND_ERROR
    }

    pub fn is_conflict_error(&self) -> bool {
        self.code == CONFLICT_ERROR
    }

    pub fn is_unauthorized_error(&self) -> bool {
        self.code == UNAUTHORIZED_ERROR
    }

    pub fn is_internal_error(&self) -> bool {
        (1..=99).contains(&self.code)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        Self {
            code: ENV_VAR_ERROR,
            message: format!("environment variable error: {}", err),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        tracing::error!(?err, "authorization engine failure");

        Self {
            code: AUTHORIZATION_ENGINE_ERROR,
            message: "authorization engine error".into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            NOT_FOUND_ERROR => (StatusCode::NOT_FOUND, self.message.as_str()),
            CONFLICT_ERROR => (StatusCode::CONFLICT, self.message.as_str()),
            UNAUTHORIZED_ERROR => (StatusCode::FORBIDDEN, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!(?err, "database failure");

    Error {
        code: DATABASE_ERROR,
        message: "database error".into(),
    }
}

#[test]
fn caller_errors_are_not_internal_test() {
    assert!(Error::conflict_error("bidding closed").is_conflict_error());
    assert!(!Error::conflict_error("bidding closed").is_internal_error());
    assert!(!Error::not_found_error("booking").is_conflict_error());
    assert!(Error::config_error("bad value").is_internal_error());
    assert!(Error::unexpected_error("boom").is_internal_error());
}

#[test]
fn error_status_mapping_test() {
    let response = Error::conflict_error("bidding closed").into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = Error::not_found_error("booking").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = Error::invalid_request_error("amount").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = Error::unauthorized_error().into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = database_error("connection refused").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
