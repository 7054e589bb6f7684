//! Route recommendation HTTP endpoint.
//!
//! - GET /api/v1/routes/recommendation?hour=H[&mile=M][&user=U]

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::models::RouteRecord;
use crate::routes::AppState;
use crate::services::forecast::ForecastError;
use crate::services::wind::WindDirection;

/// Maximum characters of route notes shown in a reply.
const NOTES_DISPLAY_CHARS: usize = 90;
const DEFAULT_USER: &str = "anonymous";
const NO_MATCH_REPLY: &str = "No suitable routes found for the specified wind direction.";

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecommendationQuery {
    /// Local hour of day (0-23). A past hour resolves to tomorrow.
    pub hour: u32,
    /// Desired ride length in miles. Without it a random route in the
    /// configured distance band is picked.
    pub mile: Option<f64>,
    /// Requesting user, for usage counting
    pub user: Option<String>,
}

/// Recommended route for a requested hour.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationResponse {
    /// Requested local hour
    pub hour: u32,
    /// Requested distance in miles, if any
    pub mile: Option<f64>,
    /// Forecast wind direction; null beyond the forecast horizon
    pub wind_direction: Option<WindDirection>,
    /// Time of the forecast entry used (RFC 3339)
    pub forecast_time: Option<String>,
    /// Recommended route; null when nothing matches
    pub route: Option<RouteRecord>,
    /// Human-readable reply
    pub message: String,
    /// How many recommendations this user has requested, including this one
    pub request_count: u64,
}

/// Truncate notes to the display limit, counting characters.
pub(crate) fn truncate_notes(notes: &str) -> &str {
    match notes.char_indices().nth(NOTES_DISPLAY_CHARS) {
        Some((byte_index, _)) => &notes[..byte_index],
        None => notes,
    }
}

/// Reply text for a recommended route.
pub(crate) fn route_reply(route: &RouteRecord) -> String {
    let name = if route.name.is_empty() {
        "N/A"
    } else {
        route.name.as_str()
    };
    let direction = route
        .ideal_wind_direction
        .map(|d| d.as_str())
        .unwrap_or("N/A");
    let notes = route
        .notes
        .as_deref()
        .map(truncate_notes)
        .unwrap_or("No additional notes.");

    format!(
        "Recommended Route: {}\nDistance: {} miles\nIdeal Wind Direction: {}\nLink: {}\nNotes: {}",
        name,
        route.distance_miles,
        direction,
        route.link.as_deref().unwrap_or("N/A"),
        notes
    )
}

/// Recommend a cycling route for the forecast wind at an hour.
///
/// Routes are matched on exact ideal wind direction. With `mile`, the route
/// closest in distance wins; otherwise one route inside the distance band is
/// picked at random.
#[utoipa::path(
    get,
    path = "/api/v1/routes/recommendation",
    tag = "Routes",
    params(RecommendationQuery),
    responses(
        (status = 200, description = "Recommendation, or a no-match reply", body = RecommendationResponse),
        (status = 400, description = "Hour outside 0-23 or invalid mile value", body = ErrorResponse),
        (status = 502, description = "Weather feed unreachable and no valid cache", body = ErrorResponse),
    )
)]
pub async fn get_recommendation(
    State(state): State<AppState>,
    Query(params): Query<RecommendationQuery>,
) -> Result<Json<RecommendationResponse>, AppError> {
    if params.hour > 23 {
        return Err(ForecastError::InvalidHour(params.hour).into());
    }
    if let Some(mile) = params.mile {
        if !mile.is_finite() || mile < 0.0 {
            return Err(AppError::BadRequest(format!(
                "mile must be a non-negative number, got {}",
                mile
            )));
        }
    }

    let user = params
        .user
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_USER);
    let request_count = state.usage.record(user).await;
    tracing::info!(
        "Route recommendation requested by {} for hour {} (mile: {:?}, request #{})",
        user,
        params.hour,
        params.mile,
        request_count
    );

    let (forecast, routes) = tokio::join!(
        state.forecast.resolve(params.hour),
        state.catalog.catalog()
    );

    let forecast = match forecast {
        Ok(forecast) => forecast,
        Err(ForecastError::NotAvailable { target }) => {
            tracing::warn!("No forecast for hour {} (target {})", params.hour, target);
            return Ok(Json(RecommendationResponse {
                hour: params.hour,
                mile: params.mile,
                wind_direction: None,
                forecast_time: None,
                route: None,
                message: format!(
                    "Forecast not available for {}:00; cannot recommend a route.",
                    params.hour
                ),
                request_count,
            }));
        }
        Err(e) => {
            tracing::warn!(
                "Could not retrieve wind direction for hour {}: {}",
                params.hour,
                e
            );
            return Err(AppError::ExternalServiceError(format!(
                "Could not retrieve wind direction for {}:00.",
                params.hour
            )));
        }
    };

    tracing::info!(
        "Retrieved wind direction {} for hour {}",
        forecast.direction,
        params.hour
    );
    if routes.is_empty() {
        tracing::warn!("Route catalog is empty; no recommendation possible");
    }

    let selected = state
        .matcher
        .select(&routes, forecast.direction, params.mile)
        .cloned();

    let message = match &selected {
        Some(route) => {
            tracing::info!("Recommended route: {}", route.name);
            route_reply(route)
        }
        None => {
            tracing::warn!(
                "No suitable routes found for wind direction {}",
                forecast.direction
            );
            NO_MATCH_REPLY.to_string()
        }
    };

    Ok(Json(RecommendationResponse {
        hour: params.hour,
        mile: params.mile,
        wind_direction: Some(forecast.direction),
        forecast_time: Some(forecast.forecast_time.to_rfc3339()),
        route: selected,
        message,
        request_count,
    }))
}
