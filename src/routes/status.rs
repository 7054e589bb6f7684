//! Cache status HTTP endpoint.
//!
//! GET /api/v1/status reports both caches' freshness and per-user request
//! counts, without triggering any upstream fetch.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::routes::AppState;
use crate::services::catalog::CatalogStatus;
use crate::services::forecast::ForecastCacheStatus;

/// Current cache and usage state.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub forecast: ForecastCacheStatus,
    pub catalog: CatalogStatus,
    /// Recommendation requests per user
    pub usage: BTreeMap<String, u64>,
}

/// Get the current cache status.
///
/// A catalog with origin "snapshot" means the route sheet was unreachable on
/// the last refresh and the durable snapshot is being served.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Status",
    responses(
        (status = 200, description = "Current cache status", body = StatusResponse),
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (forecast, catalog, usage) = tokio::join!(
        state.forecast.status(),
        state.catalog.status(),
        state.usage.snapshot()
    );
    Json(StatusResponse {
        forecast,
        catalog,
        usage,
    })
}
