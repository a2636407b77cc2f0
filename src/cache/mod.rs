//! Worker Output Cache
//!
//! This module memoizes worker outputs behind a time-bounded, durable cache so
//! repeated analyses of the same molecule do not hit the external data sources
//! and the LLM again.
//!
//! # Cache Key Strategy
//!
//! Cache keys are SHA-256 hashes of `namespace + subject + sorted parameters`:
//! - Parameters live in a `BTreeMap`, so insertion order never changes the key
//! - Every component is length-prefixed, so `("ab", "c")` and `("a", "bc")`
//!   hash differently whatever bytes the components contain
//! - Keys are stable across restarts
//!
//! # Expiry
//!
//! A single TTL is applied at read time: an entry with `now - created_at > ttl`
//! is a logical miss. Expired entries stay on disk until
//! [`CacheStore::prune_expired`] runs.
//!
//! # Failure Semantics
//!
//! Caching is an optimization only. Read errors are logged and reported as a
//! miss, write errors are logged and dropped. None of the trait methods return
//! an error.
//!
//! # Example
//!
//! ```ignore
//! use molecule_insight::cache::{CacheConfig, CacheStore, FileCacheStore, Params};
//!
//! let cache = FileCacheStore::new(CacheConfig::default())?;
//! let params = Params::from([("query".to_string(), "dosing".to_string())]);
//!
//! if let Some(report) = cache.get("patents", "Metformin", &params).await {
//!     // served from cache
//! } else {
//!     let report = run_worker().await?;
//!     cache.set("patents", "Metformin", &params, &report).await;
//! }
//! ```

/// File-per-key durable cache store.
pub mod file;

pub use file::FileCacheStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

/// Parameter set for a cache lookup. Sorted by key, so equivalent sets collide.
pub type Params = BTreeMap<String, String>;

// ============================================================================
// Cache Types
// ============================================================================

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of misses (absent, unreadable or expired)
    pub misses: u64,
    /// Misses caused by an expired entry
    pub expired: u64,
    /// Successful writes
    pub writes: u64,
    /// Writes that failed and were dropped
    pub write_errors: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    writes: AtomicU64,
    write_errors: AtomicU64,
}

impl StatCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
        self.miss();
    }

    pub(crate) fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Configuration for the worker cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one JSON file per entry
    pub dir: PathBuf,
    /// Maximum age before an entry is treated as absent
    pub ttl: Duration,
    /// Whether the cache is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cache"),
            ttl: Duration::from_secs(168 * 3600),
            enabled: true,
        }
    }
}

/// Deterministic key for a `(namespace, subject, parameters)` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn compute(namespace: &str, subject: &str, params: &Params) -> Self {
        let mut hasher = Sha256::new();
        hash_field(&mut hasher, namespace);
        hash_field(&mut hasher, subject);
        hasher.update((params.len() as u64).to_le_bytes());
        for (key, value) in params {
            hash_field(&mut hasher, key);
            hash_field(&mut hasher, value);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Length-prefix each component so no two component lists share a byte stream
fn hash_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored worker output. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub namespace: String,
    pub subject: String,
    pub parameters: Params,
    pub created_at: DateTime<Utc>,
    pub payload: Value,
}

impl CacheEntry {
    pub fn new(
        key: &CacheKey,
        namespace: &str,
        subject: &str,
        parameters: &Params,
        payload: Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.as_str().to_string(),
            namespace: namespace.to_string(),
            subject: subject.to_string(),
            parameters: parameters.clone(),
            created_at,
            payload,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
    }

    /// `now - created_at > ttl`; an age of exactly `ttl` is still fresh
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self.age(now) > ttl
    }
}

/// Introspection record for one cached entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheItemInfo {
    #[serde(rename = "agent")]
    pub namespace: String,
    #[serde(rename = "molecule")]
    pub subject: String,
    pub age_hours: f64,
    pub expired: bool,
}

// ============================================================================
// Clock
// ============================================================================

/// Time source for expiry decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock, useful for exercising expiry in tests
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ============================================================================
// Cache Trait
// ============================================================================

/// Durable key/value store with read-time expiry.
///
/// Implementations must tolerate concurrent use; concurrent writes to the
/// same key are last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a fresh entry. Absent, expired and unreadable entries are all `None`.
    async fn get(&self, namespace: &str, subject: &str, params: &Params) -> Option<Value>;

    /// Store a payload with `created_at = now`, replacing any previous entry
    async fn set(&self, namespace: &str, subject: &str, params: &Params, payload: &Value);

    /// Physically remove expired entries, returning how many were removed
    async fn prune_expired(&self) -> usize;

    /// Remove every entry, returning how many were removed
    async fn clear_all(&self) -> usize;

    /// Describe every stored entry without side effects
    async fn info(&self) -> Vec<CacheItemInfo>;

    /// Get cache statistics
    fn stats(&self) -> CacheStats;

    /// Check if the cache is enabled
    fn is_enabled(&self) -> bool;

    /// Configured time-to-live
    fn ttl(&self) -> Duration;
}

// ============================================================================
// No-Op Cache
// ============================================================================

/// A cache that never stores anything, used when caching is disabled
#[derive(Debug, Default)]
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheStore for NoOpCache {
    async fn get(&self, _namespace: &str, _subject: &str, _params: &Params) -> Option<Value> {
        None
    }

    async fn set(&self, _namespace: &str, _subject: &str, _params: &Params, _payload: &Value) {}

    async fn prune_expired(&self) -> usize {
        0
    }

    async fn clear_all(&self) -> usize {
        0
    }

    async fn info(&self) -> Vec<CacheItemInfo> {
        Vec::new()
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }
}

/// Build the configured cache store, falling back to [`NoOpCache`] when
/// caching is disabled.
pub fn build_cache(config: CacheConfig) -> crate::types::Result<Arc<dyn CacheStore>> {
    if !config.enabled {
        tracing::info!("Worker cache disabled");
        return Ok(Arc::new(NoOpCache::new()));
    }
    Ok(Arc::new(FileCacheStore::new(config)?))
}

/// Periodically remove expired entries in the background
pub fn spawn_pruner(cache: Arc<dyn CacheStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.prune_expired().await;
            if removed > 0 {
                tracing::info!(removed, "Pruned expired cache entries");
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_is_stable() {
        let p = params(&[("query", "dosing")]);
        let key1 = CacheKey::compute("patents", "Metformin", &p);
        let key2 = CacheKey::compute("patents", "Metformin", &p);
        assert_eq!(key1, key2);
        assert_eq!(key1.as_str().len(), 64);
    }

    #[test]
    fn test_key_ignores_parameter_order() {
        let mut forward = Params::new();
        forward.insert("a".to_string(), "1".to_string());
        forward.insert("b".to_string(), "2".to_string());

        let mut backward = Params::new();
        backward.insert("b".to_string(), "2".to_string());
        backward.insert("a".to_string(), "1".to_string());

        assert_eq!(
            CacheKey::compute("ns", "Aspirin", &forward),
            CacheKey::compute("ns", "Aspirin", &backward)
        );
    }

    #[test]
    fn test_key_distinguishes_components() {
        let empty = Params::new();
        let base = CacheKey::compute("patents", "Metformin", &empty);

        assert_ne!(base, CacheKey::compute("exim", "Metformin", &empty));
        assert_ne!(base, CacheKey::compute("patents", "Aspirin", &empty));
        assert_ne!(
            base,
            CacheKey::compute("patents", "Metformin", &params(&[("query", "x")]))
        );
        // Concatenation must not collide
        assert_ne!(
            CacheKey::compute("ab", "c", &empty),
            CacheKey::compute("a", "bc", &empty)
        );
        assert_ne!(
            CacheKey::compute("ns", "s", &params(&[("a", "b=c")])),
            CacheKey::compute("ns", "s", &params(&[("a=b", "c")]))
        );
    }

    #[test]
    fn test_key_with_separator_bytes_in_components() {
        // Subject text that spells out another call's parameter encoding
        let plain = CacheKey::compute("patents", "Aspirin", &params(&[("query", "x")]));
        let smuggled = CacheKey::compute("patents", "Aspirin\x1equery\x1fx", &Params::new());
        assert_ne!(plain, smuggled);

        let split_query = CacheKey::compute(
            "ns",
            "Aspirin",
            &params(&[("query", "q\x1equery\x1fq2")]),
        );
        let split_subject =
            CacheKey::compute("ns", "Aspirin\x1equery\x1fq", &params(&[("query", "q2")]));
        assert_ne!(split_query, split_subject);

        // Parameters cannot migrate into the subject either
        assert_ne!(
            CacheKey::compute("ns", "s", &params(&[("", "")])),
            CacheKey::compute("ns", "s", &Params::new())
        );
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let created = Utc::now();
        let key = CacheKey::compute("ns", "s", &Params::new());
        let entry = CacheEntry::new(&key, "ns", "s", &Params::new(), Value::Null, created);
        let ttl = Duration::from_secs(60);

        assert!(!entry.is_expired(created + chrono::Duration::seconds(59), ttl));
        assert!(!entry.is_expired(created + chrono::Duration::seconds(60), ttl));
        assert!(entry.is_expired(
            created + chrono::Duration::seconds(60) + chrono::Duration::milliseconds(1),
            ttl
        ));
    }

    #[test]
    fn test_entry_from_the_future_is_fresh() {
        let now = Utc::now();
        let key = CacheKey::compute("ns", "s", &Params::new());
        let entry = CacheEntry::new(
            &key,
            "ns",
            "s",
            &Params::new(),
            Value::Null,
            now + chrono::Duration::hours(1),
        );
        assert!(!entry.is_expired(now, Duration::from_secs(1)));
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(5));
    }

    #[test]
    fn test_cache_hit_rate() {
        let stats = CacheStats {
            hits: 75,
            misses: 25,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 75.0).abs() < 0.001);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_noop_cache() {
        let cache = NoOpCache::new();
        let p = Params::new();

        cache.set("ns", "s", &p, &Value::from("x")).await;
        assert!(cache.get("ns", "s", &p).await.is_none());
        assert_eq!(cache.clear_all().await, 0);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_build_cache_disabled_is_noop() {
        let cache = build_cache(CacheConfig {
            enabled: false,
            ..Default::default()
        })
        .unwrap();
        assert!(!cache.is_enabled());
    }
}
