use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::forecast::ForecastError;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Failure of an outbound fetch (weather feed or route sheet).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection failure or timeout.
    #[error("{source_name} request failed: {message}")]
    Transport {
        source_name: &'static str,
        message: String,
    },

    /// Non-2xx response.
    #[error("{source_name} returned HTTP {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },

    /// Body could not be decoded into the expected structure.
    #[error("{source_name} response could not be decoded: {message}")]
    Decode {
        source_name: &'static str,
        message: String,
    },
}

impl FetchError {
    pub(crate) fn transport(source_name: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("timed out ({})", err)
        } else {
            err.to_string()
        };
        FetchError::Transport {
            source_name,
            message,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream failure with no fallback; the message is shown to the user as-is.
    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::InvalidHour(_) => AppError::BadRequest(err.to_string()),
            ForecastError::Upstream(_) => {
                AppError::ExternalServiceError("Could not retrieve forecast data.".to_string())
            }
            ForecastError::NotAvailable { .. } => AppError::ExternalServiceError(
                "Forecast not available for the requested time.".to_string(),
            ),
        }
    }
}
