//! OpenWeatherMap 5 day / 3 hour forecast client.
//!
//! Fetches the forecast feed for a fixed location.
//! See: https://openweathermap.org/forecast5

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::FetchError;
use crate::services::forecast::{ForecastEntry, ForecastFeed, ForecastSource};
use crate::services::wind::WindDirection;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const SOURCE_NAME: &str = "OpenWeatherMap";

/// Client for the OpenWeatherMap forecast API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmResponse {
    list: Vec<OwmItem>,
}

#[derive(Debug, Deserialize)]
struct OwmItem {
    dt: i64,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    deg: f64,
}

impl OpenWeatherClient {
    /// Build a client whose requests are bounded by `timeout`.
    pub fn new(
        base_url: &str,
        api_key: &str,
        latitude: f64,
        longitude: f64,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            latitude,
            longitude,
        })
    }

    /// Fetch and decode the full forecast feed.
    pub async fn fetch_feed(&self) -> Result<ForecastFeed, FetchError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);
        let lat = self.latitude.to_string();
        let lon = self.longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::transport(SOURCE_NAME, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(SOURCE_NAME, e))?;

        parse_feed(&body)
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherClient {
    async fn fetch(&self) -> Result<ForecastFeed, FetchError> {
        self.fetch_feed().await
    }
}

/// Decode a forecast response body into a chronologically sorted feed.
///
/// Every entry must carry a timestamp and a finite wind degree; a single
/// malformed entry fails the whole feed.
pub fn parse_feed(body: &[u8]) -> Result<ForecastFeed, FetchError> {
    let response: OwmResponse = serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        source_name: SOURCE_NAME,
        message: e.to_string(),
    })?;

    let mut entries = Vec::with_capacity(response.list.len());
    for item in response.list {
        let time = DateTime::<Utc>::from_timestamp(item.dt, 0).ok_or_else(|| {
            FetchError::Decode {
                source_name: SOURCE_NAME,
                message: format!("timestamp out of range: {}", item.dt),
            }
        })?;
        if !item.wind.deg.is_finite() {
            return Err(FetchError::Decode {
                source_name: SOURCE_NAME,
                message: format!("non-finite wind direction at {}", time),
            });
        }
        entries.push(ForecastEntry {
            time,
            wind_degrees: item.wind.deg,
            direction: WindDirection::from_degrees(item.wind.deg),
        });
    }

    entries.sort_by_key(|e| e.time);
    Ok(ForecastFeed { entries })
}
