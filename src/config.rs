use std::str::FromStr;

use crate::services::forecast::ForecastZone;
use crate::services::openweather::OPENWEATHER_BASE_URL;
use crate::services::sheet::DEFAULT_ROUTE_SHEET_URL;

/// Startup configuration failure. Fatal; the process exits.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Upper bound for cache TTLs (one week).
pub const MAX_TTL_SECS: u64 = 7 * 24 * 3600;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Wall clock that requested hours refer to; the host zone when unset.
    pub forecast_zone: ForecastZone,
    pub route_sheet_url: String,
    /// Durable last-known-good catalog file.
    pub catalog_snapshot_path: String,
    pub usage_counts_path: String,
    pub port: u16,
    pub forecast_ttl_secs: u64,
    pub catalog_ttl_secs: u64,
    pub forecast_timeout_secs: u64,
    pub catalog_timeout_secs: u64,
    /// Routes shorter than this are dropped at parse time (inclusive threshold).
    pub min_route_miles: f64,
    pub band_min_miles: f64,
    pub band_max_miles: f64,
    /// Seed for reproducible route picks; entropy-seeded when unset.
    pub route_pick_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENWEATHER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENWEATHER_API_KEY"))?;

        let config = Self {
            openweather_api_key: api_key,
            openweather_base_url: lookup("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|| OPENWEATHER_BASE_URL.to_string()),
            latitude: parse_or(&lookup, "FORECAST_LAT", 40.102121327005165)?,
            longitude: parse_or(&lookup, "FORECAST_LON", -88.22681926647813)?,
            forecast_zone: match lookup("FORECAST_TZ") {
                Some(raw) => ForecastZone::Named(parse_value("FORECAST_TZ", &raw)?),
                None => ForecastZone::Host,
            },
            route_sheet_url: lookup("ROUTE_SHEET_URL")
                .unwrap_or_else(|| DEFAULT_ROUTE_SHEET_URL.to_string()),
            catalog_snapshot_path: lookup("CATALOG_SNAPSHOT_PATH")
                .unwrap_or_else(|| "./data/routes_snapshot.json".to_string()),
            usage_counts_path: lookup("USAGE_COUNTS_PATH")
                .unwrap_or_else(|| "./data/request_counts.json".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            forecast_ttl_secs: parse_or(&lookup, "FORECAST_TTL_SECS", 600)?,
            catalog_ttl_secs: parse_or(&lookup, "CATALOG_TTL_SECS", 1800)?,
            forecast_timeout_secs: parse_or(&lookup, "FORECAST_TIMEOUT_SECS", 10)?,
            catalog_timeout_secs: parse_or(&lookup, "CATALOG_TIMEOUT_SECS", 15)?,
            min_route_miles: parse_or(&lookup, "MIN_ROUTE_MILES", 10.0)?,
            band_min_miles: parse_or(&lookup, "BAND_MIN_MILES", 20.0)?,
            band_max_miles: parse_or(&lookup, "BAND_MAX_MILES", 50.0)?,
            route_pick_seed: match lookup("ROUTE_PICK_SEED") {
                Some(raw) => Some(parse_value("ROUTE_PICK_SEED", &raw)?),
                None => None,
            },
        };

        for (name, secs) in [
            ("FORECAST_TTL_SECS", config.forecast_ttl_secs),
            ("CATALOG_TTL_SECS", config.catalog_ttl_secs),
        ] {
            if secs > MAX_TTL_SECS {
                return Err(ConfigError::Invalid {
                    name,
                    value: format!("{} (more than {})", secs, MAX_TTL_SECS),
                });
            }
        }

        if !config.min_route_miles.is_finite() || config.min_route_miles < 0.0 {
            return Err(ConfigError::Invalid {
                name: "MIN_ROUTE_MILES",
                value: config.min_route_miles.to_string(),
            });
        }

        if config.band_min_miles > config.band_max_miles {
            return Err(ConfigError::Invalid {
                name: "BAND_MIN_MILES",
                value: format!(
                    "{} (greater than BAND_MAX_MILES {})",
                    config.band_min_miles, config.band_max_miles
                ),
            });
        }

        Ok(config)
    }

    pub fn forecast_ttl(&self) -> chrono::Duration {
        ttl_duration(self.forecast_ttl_secs)
    }

    pub fn catalog_ttl(&self) -> chrono::Duration {
        ttl_duration(self.catalog_ttl_secs)
    }
}

/// Callers pass values already bounded by [`MAX_TTL_SECS`].
fn ttl_duration(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}
