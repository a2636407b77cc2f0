//! Cached, bounded, failure-isolated worker invocation
//!
//! Every worker call, independent or synthesis, goes through
//! [`CachedInvoker::run`]:
//!
//! 1. Look the `(namespace, subject, params)` triple up in the cache
//! 2. On a miss, optionally join an identical in-flight computation
//! 3. Otherwise take a permit from the shared pool and run the worker under
//!    a timeout, catching errors and panics
//! 4. Write successful payloads back to the cache
//!
//! The outcome is always a [`WorkerResult`]; nothing here returns an error.

use crate::cache::{CacheKey, CacheStore, Params};
use crate::types::{Result, WorkerResult};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

type Outcome = std::result::Result<Value, String>;
type InFlight = Mutex<HashMap<CacheKey, Flight>>;

/// A computation identical misses can join, with the number of callers
/// currently attached to it
struct Flight {
    cell: Arc<OnceCell<Outcome>>,
    callers: usize,
}

/// One caller's membership in a [`Flight`].
///
/// Dropping it, on return or on cancellation, detaches the caller. The entry
/// leaves the map once its outcome is settled or its last caller is gone, and
/// a remaining caller takes over an initialization its leader abandoned.
struct FlightGuard<'a> {
    in_flight: &'a InFlight,
    key: CacheKey,
    cell: Arc<OnceCell<Outcome>>,
}

impl<'a> FlightGuard<'a> {
    fn join(in_flight: &'a InFlight, key: CacheKey) -> Self {
        let cell = {
            let mut map = in_flight.lock();
            let flight = map.entry(key.clone()).or_insert_with(|| Flight {
                cell: Arc::new(OnceCell::new()),
                callers: 0,
            });
            flight.callers += 1;
            Arc::clone(&flight.cell)
        };
        Self { in_flight, key, cell }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.in_flight.lock();
        let Some(flight) = map.get_mut(&self.key) else {
            return;
        };
        // A later flight for the same key is not ours to touch
        if !Arc::ptr_eq(&flight.cell, &self.cell) {
            return;
        }
        flight.callers = flight.callers.saturating_sub(1);
        if flight.callers == 0 || self.cell.initialized() {
            map.remove(&self.key);
        }
    }
}

/// Settings for [`CachedInvoker`]
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Permits in the shared worker pool
    pub max_workers: usize,
    /// Upper bound on a single worker invocation
    pub worker_timeout: Duration,
    /// Let concurrent identical cache misses share one computation
    pub single_flight: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_workers: 6,
            worker_timeout: Duration::from_secs(120),
            single_flight: true,
        }
    }
}

pub struct CachedInvoker {
    cache: Arc<dyn CacheStore>,
    pool: Arc<Semaphore>,
    max_workers: usize,
    timeout: Duration,
    in_flight: Option<InFlight>,
}

impl CachedInvoker {
    pub fn new(cache: Arc<dyn CacheStore>, config: InvokerConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        Self {
            cache,
            pool: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            timeout: config.worker_timeout,
            in_flight: config.single_flight.then(|| Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Permits not currently held by a running worker
    pub fn available_permits(&self) -> usize {
        self.pool.available_permits()
    }

    /// Number of computations other callers could currently join
    pub fn in_flight(&self) -> usize {
        self.in_flight.as_ref().map_or(0, |m| m.lock().len())
    }

    /// Resolve one worker call to a [`WorkerResult`] named `result_name`.
    ///
    /// `compute` is only called on a cache miss, and at most once per
    /// concurrent group of identical misses when single-flight is enabled.
    pub async fn run<F, Fut>(
        &self,
        namespace: &str,
        result_name: &str,
        subject: &str,
        params: &Params,
        compute: F,
    ) -> WorkerResult
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value>> + Send,
    {
        if let Some(payload) = self.cache.get(namespace, subject, params).await {
            info!(worker = namespace, subject, "Served from cache");
            return WorkerResult::success(result_name, payload, true);
        }

        let outcome = match &self.in_flight {
            Some(in_flight) => {
                self.run_single_flight(in_flight, namespace, subject, params, compute)
                    .await
            }
            None => self.execute(namespace, subject, params, compute).await,
        };

        match outcome {
            Ok(payload) => WorkerResult::success(result_name, payload, false),
            Err(error) => WorkerResult::failure(result_name, error),
        }
    }

    async fn run_single_flight<F, Fut>(
        &self,
        in_flight: &InFlight,
        namespace: &str,
        subject: &str,
        params: &Params,
        compute: F,
    ) -> Outcome
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value>> + Send,
    {
        let flight = FlightGuard::join(in_flight, CacheKey::compute(namespace, subject, params));

        let led = AtomicBool::new(false);
        let led_ref = &led;
        let outcome = flight
            .cell
            .get_or_init(|| async move {
                led_ref.store(true, Ordering::Relaxed);
                self.execute(namespace, subject, params, compute).await
            })
            .await
            .clone();

        if !led.load(Ordering::Relaxed) {
            debug!(worker = namespace, subject, "Joined in-flight computation");
        }

        outcome
    }

    async fn execute<F, Fut>(&self, namespace: &str, subject: &str, params: &Params, compute: F) -> Outcome
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value>> + Send,
    {
        let _permit = self
            .pool
            .acquire()
            .await
            .map_err(|_| "worker pool is closed".to_string())?;

        info!(worker = namespace, subject, "Running worker");
        let started = Instant::now();

        let guarded = AssertUnwindSafe(tokio::time::timeout(self.timeout, compute()));
        let outcome = match guarded.catch_unwind().await {
            Ok(Ok(Ok(payload))) => Ok(payload),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(_)) => Err(format!(
                "worker timed out after {}s",
                self.timeout.as_secs_f64()
            )),
            Err(panic) => Err(format!("worker panicked: {}", panic_message(&*panic))),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(payload) => {
                info!(worker = namespace, subject, elapsed_ms, "Worker completed");
                self.cache.set(namespace, subject, params, payload).await;
            }
            Err(error) => {
                warn!(worker = namespace, subject, elapsed_ms, error = %error, "Worker failed");
            }
        }

        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
