pub mod forecasts;
pub mod health;
pub mod recommendations;
pub mod status;

use std::sync::Arc;

use crate::services::catalog::RouteCatalogCache;
use crate::services::forecast::ForecastCache;
use crate::services::matcher::RouteMatcher;
use crate::services::usage::UsageCounter;

/// Shared application state for all endpoints.
#[derive(Clone)]
pub struct AppState {
    pub forecast: Arc<ForecastCache>,
    pub catalog: Arc<RouteCatalogCache>,
    pub matcher: Arc<RouteMatcher>,
    pub usage: Arc<UsageCounter>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Duration;

    use crate::cache::testing::FakeClock;
    use crate::models::RouteRecord;
    use crate::services::catalog::testing::FakeRouteSource;
    use crate::services::forecast::testing::FakeForecastSource;
    use crate::services::forecast::{ForecastFeed, ForecastZone};
    use crate::services::matcher::{DistanceBand, FirstPick};
    use crate::services::snapshot::SnapshotStore;

    /// State wired to fake sources at a fixed time, with deterministic picks.
    ///
    /// Keep the returned `TempDir` alive for the duration of the test.
    pub(crate) async fn state_with(
        now: &str,
        feed: Option<ForecastFeed>,
        routes: Vec<RouteRecord>,
    ) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FakeClock::at(now));

        let forecast_source = match feed {
            Some(feed) => FakeForecastSource::always(feed),
            None => FakeForecastSource::scripted(Vec::new()),
        };
        let forecast = ForecastCache::new(
            Arc::new(forecast_source),
            clock.clone(),
            ForecastZone::Named(chrono_tz::UTC),
            Duration::seconds(600),
        );
        let catalog = RouteCatalogCache::new(
            Arc::new(FakeRouteSource::always(routes)),
            SnapshotStore::new(dir.path().join("routes_snapshot.json")),
            clock,
            Duration::seconds(1800),
        );
        let usage = UsageCounter::load(dir.path().join("request_counts.json")).await;

        let state = AppState {
            forecast: Arc::new(forecast),
            catalog: Arc::new(catalog),
            matcher: Arc::new(RouteMatcher::new(DistanceBand::default(), Box::new(FirstPick))),
            usage: Arc::new(usage),
        };
        (state, dir)
    }
}
