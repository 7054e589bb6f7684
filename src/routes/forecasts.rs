//! Wind forecast HTTP endpoint.
//!
//! - GET /api/v1/wind?hour=H

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::forecast::{ForecastError, WindForecast};
use crate::services::wind::WindDirection;

/// Display format for forecast times in reply text.
const REPLY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindQuery {
    /// Local hour of day (0-23). A past hour resolves to tomorrow.
    pub hour: u32,
}

/// Wind direction forecast for a requested hour.
#[derive(Debug, Serialize, ToSchema)]
pub struct WindForecastResponse {
    /// Requested local hour
    pub hour: u32,
    /// Next occurrence of the requested hour (RFC 3339)
    pub target_time: String,
    /// `false` when the target lies beyond the forecast horizon (~5 days)
    pub forecast_available: bool,
    /// Forecast wind direction (8-point)
    pub direction: Option<WindDirection>,
    /// Wind direction in degrees the wind blows from
    pub wind_degrees: Option<f64>,
    /// Time of the 3-hourly forecast entry used (RFC 3339)
    pub forecast_time: Option<String>,
    /// Human-readable reply
    pub message: String,
}

/// Reply text for a resolved forecast.
pub(crate) fn wind_reply(forecast: &WindForecast) -> String {
    format!(
        "Wind direction at {} will be {}.",
        forecast.forecast_time.format(REPLY_TIME_FORMAT),
        forecast.direction
    )
}

/// Get the forecast wind direction for the next occurrence of an hour.
///
/// Uses the first 3-hourly forecast entry at or after the requested time.
#[utoipa::path(
    get,
    path = "/api/v1/wind",
    tag = "Forecasts",
    params(WindQuery),
    responses(
        (status = 200, description = "Wind forecast (or horizon miss)", body = WindForecastResponse),
        (status = 400, description = "Hour outside 0-23", body = ErrorResponse),
        (status = 502, description = "Weather feed unreachable and no valid cache", body = ErrorResponse),
    )
)]
pub async fn get_wind_forecast(
    State(state): State<AppState>,
    Query(params): Query<WindQuery>,
) -> Result<Json<WindForecastResponse>, AppError> {
    tracing::info!("Wind forecast requested for hour {}", params.hour);

    match state.forecast.resolve(params.hour).await {
        Ok(forecast) => {
            let message = wind_reply(&forecast);
            tracing::info!("{}", message);
            Ok(Json(WindForecastResponse {
                hour: params.hour,
                target_time: forecast.target_time.to_rfc3339(),
                forecast_available: true,
                direction: Some(forecast.direction),
                wind_degrees: Some(forecast.wind_degrees),
                forecast_time: Some(forecast.forecast_time.to_rfc3339()),
                message,
            }))
        }
        Err(ForecastError::NotAvailable { target }) => Ok(Json(WindForecastResponse {
            hour: params.hour,
            target_time: target.to_rfc3339(),
            forecast_available: false,
            direction: None,
            wind_degrees: None,
            forecast_time: None,
            message: "Forecast not available for the requested time.".to_string(),
        })),
        Err(e) => {
            tracing::warn!(
                "Could not retrieve wind direction for hour {}: {}",
                params.hour,
                e
            );
            Err(e.into())
        }
    }
}
