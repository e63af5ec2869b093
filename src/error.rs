use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::i18n::{Locale, MessageKey};
use crate::users::validation::{FieldErrors, LocalizedFieldErrors};

/// Per-request failure taxonomy. None of these are fatal to the process;
/// every variant maps to a JSON error envelope for the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failure")]
    Validation(FieldErrors),

    #[error("activation e-mail could not be delivered")]
    EmailDelivery,

    #[error("unknown or stale activation token")]
    InvalidToken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidToken => StatusCode::BAD_REQUEST,
            ApiError::EmailDelivery => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Uniform error envelope. `validationErrors` is present only for
/// validation failures.
#[derive(Debug, Serialize)]
struct ErrorBody {
    path: String,
    timestamp: i64,
    message: String,
    #[serde(rename = "validationErrors", skip_serializing_if = "Option::is_none")]
    validation_errors: Option<LocalizedFieldErrors>,
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// An [`ApiError`] bound to the request it failed, ready to render in the
/// caller's negotiated language.
#[derive(Debug)]
pub struct ErrorReply {
    error: ApiError,
    path: String,
    locale: Locale,
}

impl ErrorReply {
    pub fn new(error: ApiError, path: &str, locale: Locale) -> Self {
        Self {
            error,
            path: path.to_string(),
            locale,
        }
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let (message, validation_errors) = match &self.error {
            ApiError::Validation(errors) => (
                self.locale.text(MessageKey::ValidationFailure).to_string(),
                Some(errors.localize(self.locale)),
            ),
            ApiError::EmailDelivery => {
                (self.locale.text(MessageKey::EmailFailure).to_string(), None)
            }
            ApiError::InvalidToken => {
                (self.locale.text(MessageKey::InvalidToken).to_string(), None)
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, path = %self.path, "unexpected error");
                ("Internal server error".to_string(), None)
            }
        };

        let body = ErrorBody {
            path: self.path,
            timestamp: now_millis(),
            message,
            validation_errors,
        };
        (status, Json(body)).into_response()
    }
}
