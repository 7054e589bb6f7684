use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" whenever the process is serving)
    pub status: String,
    /// Liveness reply
    pub message: String,
    /// API version
    pub version: String,
}

/// Liveness check.
///
/// Does not touch the weather feed or the route sheet, so it stays cheap
/// and succeeds even while upstreams are down.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse),
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    tracing::debug!("Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Pong!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
