// Wind Route API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod cache;
mod config;
mod errors;
mod models;
mod routes;
mod services;

use cache::SystemClock;
use config::AppConfig;
use routes::AppState;
use services::catalog::RouteCatalogCache;
use services::forecast::ForecastCache;
use services::matcher::{DistanceBand, RandomPick, RouteMatcher, SelectionStrategy};
use services::openweather::OpenWeatherClient;
use services::sheet::SheetClient;
use services::snapshot::SnapshotStore;
use services::usage::UsageCounter;

/// Wind Route API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wind Route API",
        version = "0.1.0",
        description = "Recommends a cycling route for a given hour based on the forecast \
            wind direction. Forecasts come from OpenWeatherMap (3-hourly, cached), routes \
            from a shared spreadsheet (cached, with an on-disk last-known-good snapshot).",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Liveness check"),
        (name = "Forecasts", description = "Wind direction forecast"),
        (name = "Routes", description = "Route recommendation"),
        (name = "Status", description = "Cache and usage status"),
    ),
    paths(
        routes::health::health_check,
        routes::forecasts::get_wind_forecast,
        routes::recommendations::get_recommendation,
        routes::status::get_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::forecasts::WindForecastResponse,
            routes::recommendations::RecommendationResponse,
            routes::status::StatusResponse,
            models::RouteRecord,
            services::wind::WindDirection,
            services::forecast::ForecastCacheStatus,
            services::catalog::CatalogStatus,
            services::catalog::CatalogOrigin,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wind_route_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = match build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to build HTTP clients: {}", e);
            std::process::exit(1);
        }
    };

    // CORS: read-only API, GET only
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/wind", get(routes::forecasts::get_wind_forecast))
        .route(
            "/api/v1/routes/recommendation",
            get(routes::recommendations::get_recommendation),
        )
        .route("/api/v1/status", get(routes::status::get_status))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server terminated unexpectedly: {}", e);
        std::process::exit(1);
    }
}

/// Wire the caches, matcher and usage counter from configuration.
async fn build_state(config: &AppConfig) -> Result<AppState, reqwest::Error> {
    let clock = Arc::new(SystemClock);

    let weather = OpenWeatherClient::new(
        &config.openweather_base_url,
        &config.openweather_api_key,
        config.latitude,
        config.longitude,
        std::time::Duration::from_secs(config.forecast_timeout_secs),
    )?;
    let sheet = SheetClient::new(
        &config.route_sheet_url,
        config.min_route_miles,
        std::time::Duration::from_secs(config.catalog_timeout_secs),
    )?;

    let forecast = ForecastCache::new(
        Arc::new(weather),
        clock.clone(),
        config.forecast_zone,
        config.forecast_ttl(),
    );
    let catalog = RouteCatalogCache::new(
        Arc::new(sheet),
        SnapshotStore::new(&config.catalog_snapshot_path),
        clock,
        config.catalog_ttl(),
    );

    let strategy: Box<dyn SelectionStrategy> = match config.route_pick_seed {
        Some(seed) => {
            tracing::info!("Route picks seeded with {}", seed);
            Box::new(RandomPick::seeded(seed))
        }
        None => Box::new(RandomPick::from_entropy()),
    };
    let matcher = RouteMatcher::new(
        DistanceBand {
            min_miles: config.band_min_miles,
            max_miles: config.band_max_miles,
        },
        strategy,
    );
    let band = matcher.band();
    tracing::info!(
        "Routes without a mile hint are picked from {}-{} miles",
        band.min_miles,
        band.max_miles
    );

    let usage = UsageCounter::load(&config.usage_counts_path).await;

    tracing::info!(
        "Forecast for ({}, {}) in {:?} time, TTL {}s; route sheet TTL {}s, snapshot at {}",
        config.latitude,
        config.longitude,
        config.forecast_zone,
        config.forecast_ttl_secs,
        config.catalog_ttl_secs,
        config.catalog_snapshot_path
    );

    Ok(AppState {
        forecast: Arc::new(forecast),
        catalog: Arc::new(catalog),
        matcher: Arc::new(matcher),
        usage: Arc::new(usage),
    })
}
