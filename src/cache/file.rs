use super::{
    CacheConfig, CacheEntry, CacheItemInfo, CacheKey, CacheStats, CacheStore, Clock, Params,
    StatCounters, SystemClock,
};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Durable cache keeping one pretty-printed JSON file per entry.
///
/// Files are named `<sha256-key>.json`. Writes go to a uniquely named temp
/// file in the same directory and are renamed into place, so a concurrent
/// reader sees either the old entry or the new one, never a torn file.
pub struct FileCacheStore {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: StatCounters,
}

impl FileCacheStore {
    /// Create a store rooted at `config.dir`, creating the directory if needed
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with a custom time source
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        std::fs::create_dir_all(&config.dir).map_err(|e| {
            AppError::Cache(format!(
                "Failed to create cache directory {}: {}",
                config.dir.display(),
                e
            ))
        })?;

        info!(dir = %config.dir.display(), ttl_secs = config.ttl.as_secs(), "Worker cache ready");

        Ok(Self {
            dir: config.dir,
            ttl: config.ttl,
            clock,
            counters: StatCounters::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    async fn read_entry(path: &Path) -> std::io::Result<Option<CacheEntry>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
    }

    /// Paths of every entry file currently in the cache directory
    async fn entry_files(&self) -> Vec<PathBuf> {
        self.files_with_extension(ENTRY_EXTENSION).await
    }

    /// Files in the cache directory ending in `.{extension}`
    async fn files_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list cache directory");
                return files;
            }
        };

        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                        files.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read cache directory entry");
                    break;
                }
            }
        }

        files
    }

    async fn write_entry(&self, key: &CacheKey, entry: &CacheEntry) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(entry)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

        let tmp = self
            .dir
            .join(format!(".{}.{}.{}", key, uuid::Uuid::new_v4().simple(), TEMP_EXTENSION));
        tokio::fs::write(&tmp, json).await?;

        if let Err(e) = tokio::fs::rename(&tmp, self.entry_path(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, namespace: &str, subject: &str, params: &Params) -> Option<Value> {
        let key = CacheKey::compute(namespace, subject, params);
        let path = self.entry_path(&key);

        let entry = match Self::read_entry(&path).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(namespace, subject, "Cache miss");
                self.counters.miss();
                return None;
            }
            Err(e) => {
                warn!(namespace, subject, cache_key = %key, error = %e, "Unreadable cache entry, treating as miss");
                self.counters.miss();
                return None;
            }
        };

        if entry.is_expired(self.clock.now(), self.ttl) {
            debug!(namespace, subject, "Expired cache entry");
            self.counters.expired();
            return None;
        }

        debug!(namespace, subject, "Cache hit");
        self.counters.hit();
        Some(entry.payload)
    }

    async fn set(&self, namespace: &str, subject: &str, params: &Params, payload: &Value) {
        let key = CacheKey::compute(namespace, subject, params);
        let entry = CacheEntry::new(
            &key,
            namespace,
            subject,
            params,
            payload.clone(),
            self.clock.now(),
        );

        match self.write_entry(&key, &entry).await {
            Ok(()) => {
                debug!(namespace, subject, cache_key = %key, "Stored cache entry");
                self.counters.write();
            }
            Err(e) => {
                warn!(namespace, subject, cache_key = %key, error = %e, "Failed to write cache entry");
                self.counters.write_error();
            }
        }
    }

    async fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        for path in self.entry_files().await {
            let stale = match Self::read_entry(&path).await {
                Ok(Some(entry)) => entry.is_expired(now, self.ttl),
                Ok(None) => false,
                // Unparseable entries can never be served
                Err(_) => true,
            };

            if stale {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache entry"),
                }
            }
        }

        info!(removed, "Cleared expired cache entries");
        removed
    }

    async fn clear_all(&self) -> usize {
        let mut removed = 0;

        for path in self.entry_files().await {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache entry"),
            }
        }

        // Leftovers of writes interrupted before their rename
        let mut temp_removed = 0;
        for path in self.files_with_extension(TEMP_EXTENSION).await {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => temp_removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache temp file"),
            }
        }

        info!(removed, temp_removed, "Cleared all cache entries");
        removed
    }

    async fn info(&self) -> Vec<CacheItemInfo> {
        let now = self.clock.now();
        let mut items = Vec::new();

        for path in self.entry_files().await {
            if let Ok(Some(entry)) = Self::read_entry(&path).await {
                let age = entry.age(now);
                items.push(CacheItemInfo {
                    age_hours: age.num_milliseconds() as f64 / 3_600_000.0,
                    expired: entry.is_expired(now, self.ttl),
                    namespace: entry.namespace,
                    subject: entry.subject,
                });
            }
        }

        items.sort_by(|a, b| {
            (a.namespace.as_str(), a.subject.as_str()).cmp(&(b.namespace.as_str(), b.subject.as_str()))
        });
        items
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
