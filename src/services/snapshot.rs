//! Durable last-known-good route catalog.
//!
//! A single JSON file holding the most recently parsed catalog. Written after
//! every successful refresh and read only when a live fetch fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::RouteRecord;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error on catalog snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Catalog snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed catalog snapshot.
///
/// Clones share one write lock, so saves through any clone never interleave
/// on the temp file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<Vec<RouteRecord>>, SnapshotError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let routes = serde_json::from_slice(&bytes)?;
        Ok(Some(routes))
    }

    /// Overwrite the snapshot atomically (write a sibling temp file, then rename).
    pub async fn save(&self, routes: &[RouteRecord]) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(routes)?;
        let _write = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::wind::WindDirection;

    fn route(name: &str, miles: f64) -> RouteRecord {
        RouteRecord {
            name: name.to_string(),
            distance_miles: miles,
            ideal_wind_direction: Some(WindDirection::W),
            link: None,
            notes: Some("café stop".to_string()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("routes.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("routes.json"));
        let routes = vec![route("A", 20.0), route("B", 31.5)];

        store.save(&routes).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, routes);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("routes.json"));

        store.save(&[route("Old", 20.0)]).await.unwrap();
        store.save(&[route("New", 25.0)]).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "New");
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_one_complete_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("routes.json"));
        let first: Vec<RouteRecord> = (0..200).map(|i| route("First", i as f64)).collect();
        let second = vec![route("Second", 30.0)];

        let writer = store.clone();
        let (a, b) = tokio::join!(
            tokio::spawn({
                let routes = first.clone();
                async move { writer.save(&routes).await }
            }),
            store.save(&second)
        );
        a.unwrap().unwrap();
        b.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert!(loaded == first || loaded == second);
        assert!(!dir.path().join("routes.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = SnapshotStore::new(path);
        assert!(matches!(store.load().await, Err(SnapshotError::Json(_))));
    }
}
