//! Per-user recommendation request counts, persisted as a JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("IO error on usage counts file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Usage counts file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request counter keyed by user name.
pub struct UsageCounter {
    path: PathBuf,
    counts: Mutex<BTreeMap<String, u64>>,
}

impl UsageCounter {
    /// Load existing counts from `path`. A missing or unreadable file starts empty.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counts = match read_counts(&path).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(
                    "Could not load usage counts from {}, starting empty: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };
        Self {
            path,
            counts: Mutex::new(counts),
        }
    }

    /// Increment `user`'s count, persist, and return the new count.
    ///
    /// Persistence failures are logged; the in-memory count still advances.
    pub async fn record(&self, user: &str) -> u64 {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(user.to_string()).or_insert(0);
        *count += 1;
        let new_count = *count;

        if let Err(e) = write_counts(&self.path, &counts).await {
            tracing::warn!(
                "Failed to persist usage counts to {}: {}",
                self.path.display(),
                e
            );
        }
        new_count
    }

    pub async fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().await.clone()
    }
}

async fn read_counts(path: &Path) -> Result<BTreeMap<String, u64>, UsageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

async fn write_counts(path: &Path, counts: &BTreeMap<String, u64>) -> Result<(), UsageError> {
    let json = serde_json::to_vec(counts)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}
