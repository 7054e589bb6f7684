//! Route catalog cache.
//!
//! Serves the parsed route catalog from memory for a TTL. On a miss it fetches
//! the sheet; a failed fetch or parse falls back to the durable snapshot, and
//! with no snapshot to an empty catalog. Failures never leave this module.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;

use crate::cache::{CacheEntry, Clock};
use crate::errors::FetchError;
use crate::models::RouteRecord;
use crate::services::sheet::ParseError;
use crate::services::snapshot::SnapshotStore;

/// Why a route source could not produce a catalog.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Route sheet could not be parsed: {0}")]
    Parse(#[from] ParseError),
}

/// Upstream provider of parsed route records.
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn fetch_routes(&self) -> Result<Vec<RouteRecord>, SourceError>;
}

/// Where the in-memory catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrigin {
    Live,
    Snapshot,
}

/// Snapshot of the catalog cache for the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogStatus {
    pub fetched_at: Option<DateTime<Utc>>,
    pub age_secs: Option<i64>,
    pub valid: bool,
    pub origin: Option<CatalogOrigin>,
    pub route_count: usize,
}

struct CachedCatalog {
    routes: Arc<Vec<RouteRecord>>,
    origin: CatalogOrigin,
}

/// TTL cache over a [`RouteSource`] with snapshot fallback.
pub struct RouteCatalogCache {
    source: Arc<dyn RouteSource>,
    snapshot: SnapshotStore,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<CachedCatalog>>>,
    refresh: Mutex<()>,
}

impl RouteCatalogCache {
    pub fn new(
        source: Arc<dyn RouteSource>,
        snapshot: SnapshotStore,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            snapshot,
            clock,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Current catalog. Never fails; degrades to snapshot or empty.
    pub async fn catalog(&self) -> Arc<Vec<RouteRecord>> {
        if let Some(routes) = self.valid_routes().await {
            return routes;
        }

        let _refresh = self.refresh.lock().await;
        if let Some(routes) = self.valid_routes().await {
            return routes;
        }

        match self.source.fetch_routes().await {
            Ok(routes) => {
                let routes = Arc::new(routes);
                tracing::info!("Route catalog refreshed: {} routes", routes.len());
                self.store(routes.clone(), CatalogOrigin::Live).await;
                self.spawn_snapshot_write(routes.clone());
                routes
            }
            Err(e) => {
                tracing::warn!("Route sheet unavailable, trying snapshot: {}", e);
                self.fallback().await
            }
        }
    }

    pub async fn status(&self) -> CatalogStatus {
        let now = self.clock.now();
        let guard = self.entry.read().await;
        match guard.as_ref() {
            Some(entry) => CatalogStatus {
                fetched_at: Some(entry.fetched_at),
                age_secs: Some(entry.age_secs(now)),
                valid: entry.is_valid(now),
                origin: Some(entry.value.origin),
                route_count: entry.value.routes.len(),
            },
            None => CatalogStatus {
                fetched_at: None,
                age_secs: None,
                valid: false,
                origin: None,
                route_count: 0,
            },
        }
    }

    /// Adopt the snapshot as a fresh cache entry, or return an empty catalog.
    async fn fallback(&self) -> Arc<Vec<RouteRecord>> {
        match self.snapshot.load().await {
            Ok(Some(routes)) => {
                tracing::warn!(
                    "Serving {} routes from snapshot {}",
                    routes.len(),
                    self.snapshot.path().display()
                );
                let routes = Arc::new(routes);
                // fetched_at = now, so the next attempt waits a full TTL
                self.store(routes.clone(), CatalogOrigin::Snapshot).await;
                routes
            }
            Ok(None) => {
                tracing::error!(
                    "No catalog snapshot at {}; serving empty route catalog",
                    self.snapshot.path().display()
                );
                Arc::new(Vec::new())
            }
            Err(e) => {
                tracing::error!(
                    "Catalog snapshot {} unreadable ({}); serving empty route catalog",
                    self.snapshot.path().display(),
                    e
                );
                Arc::new(Vec::new())
            }
        }
    }

    async fn store(&self, routes: Arc<Vec<RouteRecord>>, origin: CatalogOrigin) {
        let fetched_at = self.clock.now();
        *self.entry.write().await = Some(CacheEntry::new(
            CachedCatalog { routes, origin },
            fetched_at,
            self.ttl,
        ));
    }

    /// Best-effort snapshot write on a background task.
    fn spawn_snapshot_write(&self, routes: Arc<Vec<RouteRecord>>) {
        let store = self.snapshot.clone();
        tokio::spawn(async move {
            match store.save(&routes).await {
                Ok(()) => tracing::debug!(
                    "Catalog snapshot written to {} ({} routes)",
                    store.path().display(),
                    routes.len()
                ),
                Err(e) => tracing::warn!(
                    "Failed to write catalog snapshot {}: {}",
                    store.path().display(),
                    e
                ),
            }
        });
    }

    async fn valid_routes(&self) -> Option<Arc<Vec<RouteRecord>>> {
        let now = self.clock.now();
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|entry| entry.is_valid(now))
            .map(|entry| entry.value.routes.clone())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted route source that counts fetches.
    pub(crate) struct FakeRouteSource {
        responses: std::sync::Mutex<VecDeque<Result<Vec<RouteRecord>, SourceError>>>,
        fallback: Option<Vec<RouteRecord>>,
        calls: AtomicUsize,
    }

    impl FakeRouteSource {
        pub(crate) fn always(routes: Vec<RouteRecord>) -> Self {
            Self {
                responses: std::sync::Mutex::new(VecDeque::new()),
                fallback: Some(routes),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self::scripted(Vec::new())
        }

        /// Returns the scripted results in order, then fails.
        pub(crate) fn scripted(responses: Vec<Result<Vec<RouteRecord>, SourceError>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into()),
                fallback: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RouteSource for FakeRouteSource {
        async fn fetch_routes(&self) -> Result<Vec<RouteRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if let Some(next) = self.responses.lock().unwrap().pop_front() {
                return next;
            }
            match &self.fallback {
                Some(routes) => Ok(routes.clone()),
                None => Err(unavailable()),
            }
        }
    }

    pub(crate) fn unavailable() -> SourceError {
        SourceError::Fetch(FetchError::Transport {
            source_name: "route sheet",
            message: "connection refused".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::cache::testing::FakeClock;
    use crate::services::wind::WindDirection;

    fn route(name: &str, miles: f64) -> RouteRecord {
        RouteRecord {
            name: name.to_string(),
            distance_miles: miles,
            ideal_wind_direction: Some(WindDirection::N),
            link: None,
            notes: None,
        }
    }

    fn clock() -> Arc<FakeClock> {
        Arc::new(FakeClock::at("2026-03-01T14:30:00+00:00"))
    }

    fn cache(
        source: Arc<FakeRouteSource>,
        snapshot: SnapshotStore,
        clock: Arc<FakeClock>,
    ) -> RouteCatalogCache {
        RouteCatalogCache::new(source, snapshot, clock, Duration::seconds(1800))
    }

    /// Wait for the background snapshot write to land.
    async fn wait_for_snapshot(store: &SnapshotStore) -> Vec<RouteRecord> {
        for _ in 0..100 {
            if let Ok(Some(routes)) = store.load().await {
                return routes;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("snapshot was never written");
    }

    #[tokio::test]
    async fn test_hit_within_ttl_returns_same_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeRouteSource::always(vec![route("A", 20.0)]));
        let clock = clock();
        let cache = cache(source.clone(), SnapshotStore::new(dir.path().join("r.json")), clock.clone());

        let first = cache.catalog().await;
        clock.advance(Duration::seconds(1799));
        let second = cache.catalog().await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeRouteSource::scripted(vec![
            Ok(vec![route("Old", 20.0)]),
            Ok(vec![route("New", 20.0)]),
        ]));
        let clock = clock();
        let cache = cache(source.clone(), SnapshotStore::new(dir.path().join("r.json")), clock.clone());

        assert_eq!(cache.catalog().await[0].name, "Old");
        clock.advance(Duration::seconds(1800));
        assert_eq!(cache.catalog().await[0].name, "New");
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_successful_refresh_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("r.json"));
        let routes = vec![route("A", 20.0), route("B", 30.0)];
        let source = Arc::new(FakeRouteSource::always(routes.clone()));
        let cache = cache(source, store.clone(), clock());

        cache.catalog().await;

        assert_eq!(wait_for_snapshot(&store).await, routes);
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_snapshot_without_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("r.json"));
        let saved = vec![route("A", 20.0), route("B", 30.0), route("C", 40.0)];
        store.save(&saved).await.unwrap();

        let source = Arc::new(FakeRouteSource::failing());
        let clock = clock();
        let cache = cache(source.clone(), store, clock.clone());

        assert_eq!(*cache.catalog().await, saved);
        assert_eq!(source.call_count(), 1);

        // Within the reset TTL window the snapshot is served from memory
        clock.advance(Duration::seconds(1799));
        assert_eq!(*cache.catalog().await, saved);
        assert_eq!(source.call_count(), 1);

        let status = cache.status().await;
        assert_eq!(status.age_secs, Some(1799));
        assert_eq!(status.origin, Some(CatalogOrigin::Snapshot));
        assert_eq!(status.route_count, 3);
    }

    #[tokio::test]
    async fn test_parse_failure_falls_back_to_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("r.json"));
        store.save(&[route("Saved", 25.0)]).await.unwrap();

        let source = Arc::new(FakeRouteSource::scripted(vec![Err(SourceError::Parse(
            ParseError::ShortRow {
                row: 4,
                expected: 5,
                found: 2,
            },
        ))]));
        let cache = cache(source, store, clock());

        assert_eq!(cache.catalog().await[0].name, "Saved");
    }

    #[tokio::test]
    async fn test_no_snapshot_returns_empty_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeRouteSource::scripted(vec![
            Err(unavailable()),
            Ok(vec![route("Back", 20.0)]),
        ]));
        let cache = cache(source.clone(), SnapshotStore::new(dir.path().join("r.json")), clock());

        assert!(cache.catalog().await.is_empty());
        assert_eq!(cache.status().await.origin, None);

        // Empty results are not cached; the next request fetches again
        assert_eq!(cache.catalog().await[0].name, "Back");
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        std::fs::write(&path, b"[{").unwrap();

        let source = Arc::new(FakeRouteSource::failing());
        let cache = cache(source, SnapshotStore::new(path), clock());

        assert!(cache.catalog().await.is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_still_serves_live_catalog() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the snapshot directory should be
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let store = SnapshotStore::new(blocker.join("r.json"));

        let source = Arc::new(FakeRouteSource::always(vec![route("A", 20.0)]));
        let clock = clock();
        let cache = cache(source.clone(), store.clone(), clock.clone());

        assert_eq!(cache.catalog().await[0].name, "A");
        // Let the background write run and fail
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        clock.advance(Duration::seconds(60));
        assert_eq!(cache.catalog().await[0].name, "A");
        assert_eq!(source.call_count(), 1);

        let status = cache.status().await;
        assert!(status.valid);
        assert_eq!(status.origin, Some(CatalogOrigin::Live));
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_live_origin_status() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeRouteSource::always(vec![route("A", 20.0)]));
        let cache = cache(source, SnapshotStore::new(dir.path().join("r.json")), clock());

        cache.catalog().await;
        let status = cache.status().await;
        assert!(status.valid);
        assert_eq!(status.origin, Some(CatalogOrigin::Live));
        assert_eq!(status.route_count, 1);
    }
}
