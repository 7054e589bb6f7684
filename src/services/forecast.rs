//! Forecast cache and hour-to-wind resolution.
//!
//! Memoizes the weather feed for a TTL and resolves a requested hour to the
//! first 3-hourly forecast entry at or after the next occurrence of that hour.
//! There is no stale fallback: when the cache is expired and the feed cannot
//! be fetched, resolution fails.

use async_trait::async_trait;
use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;

use crate::cache::{CacheEntry, Clock};
use crate::errors::FetchError;
use crate::services::wind::WindDirection;

/// One forecast point from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub wind_degrees: f64,
    pub direction: WindDirection,
}

/// Forecast feed, sorted by time.
#[derive(Debug, Clone, Default)]
pub struct ForecastFeed {
    pub entries: Vec<ForecastEntry>,
}

/// Upstream provider of the forecast feed.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self) -> Result<ForecastFeed, FetchError>;
}

/// Resolved wind forecast for a requested hour.
#[derive(Debug, Clone, PartialEq)]
pub struct WindForecast {
    pub direction: WindDirection,
    pub wind_degrees: f64,
    /// Timestamp of the selected feed entry, in the forecast zone's offset at that instant.
    pub forecast_time: DateTime<FixedOffset>,
    /// The next occurrence of the requested hour.
    pub target_time: DateTime<FixedOffset>,
}

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),

    #[error("Forecast feed unavailable: {0}")]
    Upstream(#[from] FetchError),

    /// The target lies beyond the feed's horizon.
    #[error("Forecast not available for {target}")]
    NotAvailable { target: DateTime<FixedOffset> },
}

/// Snapshot of the forecast cache for the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForecastCacheStatus {
    pub fetched_at: Option<DateTime<Utc>>,
    /// Seconds since the last successful fetch
    pub age_secs: Option<i64>,
    pub valid: bool,
    pub entry_count: usize,
    /// Time of the last entry in the feed (forecast horizon)
    pub horizon: Option<DateTime<Utc>>,
}

/// Time zone whose wall clock defines "hour H".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForecastZone {
    /// The host's local time zone.
    Host,
    Named(Tz),
}

impl ForecastZone {
    /// Next occurrence of `hour:00` on this zone's wall clock.
    pub fn target(
        &self,
        now: DateTime<Utc>,
        hour: u32,
    ) -> Result<DateTime<FixedOffset>, ForecastError> {
        match self {
            ForecastZone::Host => {
                target_datetime(&now.with_timezone(&Local), hour).map(|t| t.fixed_offset())
            }
            ForecastZone::Named(tz) => {
                target_datetime(&now.with_timezone(tz), hour).map(|t| t.fixed_offset())
            }
        }
    }

    /// `instant` in the offset this zone uses at that instant.
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            ForecastZone::Host => instant.with_timezone(&Local).fixed_offset(),
            ForecastZone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }
}

/// Compute the next occurrence of `hour:00:00` on the wall clock of `now`'s zone.
///
/// Returns today's slot unless it is strictly before `now`, in which case the
/// same wall-clock hour on the next calendar day.
/// An hour equal to "now" on the dot resolves to today.
pub fn target_datetime<Z: TimeZone>(
    now: &DateTime<Z>,
    hour: u32,
) -> Result<DateTime<Z>, ForecastError> {
    let slot = NaiveTime::from_hms_opt(hour, 0, 0).ok_or(ForecastError::InvalidHour(hour))?;
    let zone = now.timezone();
    let today = now.date_naive();

    let candidate =
        on_wall_clock(&zone, today.and_time(slot)).ok_or(ForecastError::InvalidHour(hour))?;
    if candidate >= *now {
        return Ok(candidate);
    }

    let tomorrow = today.succ_opt().ok_or(ForecastError::InvalidHour(hour))?;
    on_wall_clock(&zone, tomorrow.and_time(slot)).ok_or(ForecastError::InvalidHour(hour))
}

/// Map a wall-clock time to an instant. A repeated hour takes its first
/// occurrence; a skipped hour takes the first instant after the gap.
fn on_wall_clock<Z: TimeZone>(zone: &Z, wall: NaiveDateTime) -> Option<DateTime<Z>> {
    match wall.and_local_timezone(zone.clone()) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (wall + Duration::hours(1))
            .and_local_timezone(zone.clone())
            .earliest(),
    }
}

/// First entry at or after `target`, scanning in chronological order.
pub fn first_entry_at_or_after(
    feed: &ForecastFeed,
    target: DateTime<FixedOffset>,
) -> Option<&ForecastEntry> {
    feed.entries.iter().find(|entry| entry.time >= target)
}

/// TTL cache over a [`ForecastSource`].
pub struct ForecastCache {
    source: Arc<dyn ForecastSource>,
    clock: Arc<dyn Clock>,
    zone: ForecastZone,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<Arc<ForecastFeed>>>>,
    /// Serializes refreshes so concurrent misses share one fetch.
    refresh: Mutex<()>,
}

impl ForecastCache {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        clock: Arc<dyn Clock>,
        zone: ForecastZone,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            zone,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Resolve the wind direction for the next occurrence of `hour`.
    pub async fn resolve(&self, hour: u32) -> Result<WindForecast, ForecastError> {
        let target = self.zone.target(self.clock.now(), hour)?;
        let feed = self.feed().await?;

        let entry = first_entry_at_or_after(&feed, target).ok_or_else(|| {
            tracing::info!(
                "No forecast entry at or after {} ({} entries in feed)",
                target,
                feed.entries.len()
            );
            ForecastError::NotAvailable { target }
        })?;

        Ok(WindForecast {
            direction: entry.direction,
            wind_degrees: entry.wind_degrees,
            forecast_time: self.zone.localize(entry.time),
            target_time: target,
        })
    }

    /// Current cache state without triggering a fetch.
    pub async fn status(&self) -> ForecastCacheStatus {
        let now = self.clock.now();
        let guard = self.entry.read().await;
        match guard.as_ref() {
            Some(entry) => ForecastCacheStatus {
                fetched_at: Some(entry.fetched_at),
                age_secs: Some(entry.age_secs(now)),
                valid: entry.is_valid(now),
                entry_count: entry.value.entries.len(),
                horizon: entry.value.entries.last().map(|e| e.time),
            },
            None => ForecastCacheStatus {
                fetched_at: None,
                age_secs: None,
                valid: false,
                entry_count: 0,
                horizon: None,
            },
        }
    }

    /// Return the cached feed if valid, otherwise fetch and replace it.
    async fn feed(&self) -> Result<Arc<ForecastFeed>, ForecastError> {
        if let Some(feed) = self.valid_feed().await {
            return Ok(feed);
        }

        let _refresh = self.refresh.lock().await;

        // Another request may have refreshed while we waited
        if let Some(feed) = self.valid_feed().await {
            return Ok(feed);
        }

        match self.source.fetch().await {
            Ok(feed) => {
                let feed = Arc::new(feed);
                let fetched_at = self.clock.now();
                tracing::info!(
                    "Forecast feed refreshed: {} entries, horizon {:?}",
                    feed.entries.len(),
                    feed.entries.last().map(|e| e.time)
                );
                *self.entry.write().await =
                    Some(CacheEntry::new(feed.clone(), fetched_at, self.ttl));
                Ok(feed)
            }
            Err(e) => {
                tracing::error!("Forecast feed fetch failed and no valid cache exists: {}", e);
                Err(ForecastError::Upstream(e))
            }
        }
    }

    async fn valid_feed(&self) -> Option<Arc<ForecastFeed>> {
        let now = self.clock.now();
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|entry| entry.is_valid(now))
            .map(|entry| entry.value.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
