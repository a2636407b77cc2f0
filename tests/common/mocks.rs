//! Mock implementations for testing.
//!
//! Hand-written LLM clients and workers shared by the integration tests.

use async_trait::async_trait;
use molecule_insight::cache::Params;
use molecule_insight::llm::LLMClient;
use molecule_insight::types::{AppError, Result};
use molecule_insight::workers::{SynthesisInputs, SynthesisWorker, Worker};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============= Mock LLM Client =============

/// Mock LLM client returning a fixed response and recording prompts.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

// ============= Concurrency Tracking =============

/// Shared counters observed by tracked workers
#[derive(Debug, Default)]
pub struct Tracker {
    active: AtomicUsize,
    max_active: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl Tracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

// ============= Workers =============

/// Worker returning `"<name> report on <subject>"` after an optional delay
pub struct StaticWorker {
    name: String,
    delay: Duration,
    tracker: Option<Arc<Tracker>>,
    args: Params,
}

impl StaticWorker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            tracker: None,
            args: Params::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_arg(mut self, key: &str, value: &str) -> Self {
        self.args.insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl Worker for StaticWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns a canned report"
    }

    fn default_args(&self) -> Params {
        self.args.clone()
    }

    async fn invoke(&self, subject: &str, _params: &Params) -> Result<Value> {
        if let Some(tracker) = &self.tracker {
            tracker.enter();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(tracker) = &self.tracker {
            tracker.exit();
        }
        Ok(json!(format!("{} report on {}", self.name, subject)))
    }
}

/// Worker that always fails with a data source error
pub struct FailingWorker {
    name: String,
    tracker: Option<Arc<Tracker>>,
}

impl FailingWorker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tracker: None,
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }
}

#[async_trait]
impl Worker for FailingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn invoke(&self, _subject: &str, _params: &Params) -> Result<Value> {
        if let Some(tracker) = &self.tracker {
            tracker.enter();
            tracker.exit();
        }
        Err(AppError::Source(format!("{} upstream unavailable", self.name)))
    }
}

/// Worker that panics mid-invocation
pub struct PanickingWorker;

#[async_trait]
impl Worker for PanickingWorker {
    fn name(&self) -> &str {
        "panicky"
    }

    fn display_name(&self) -> &str {
        "Panicky"
    }

    fn description(&self) -> &str {
        "Panics"
    }

    async fn invoke(&self, _subject: &str, _params: &Params) -> Result<Value> {
        panic!("index out of bounds in panicky worker");
    }
}

/// Worker that counts its invocations
pub struct CountingWorker {
    name: String,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingWorker {
    pub fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name: name.to_string(),
                calls: calls.clone(),
                delay: Duration::ZERO,
            },
            calls,
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Worker for CountingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Counts invocations"
    }

    async fn invoke(&self, subject: &str, params: &Params) -> Result<Value> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(json!({
            "subject": subject,
            "query": params.get("query"),
            "call": n,
        }))
    }
}

// ============= Synthesis =============

/// What the synthesis worker saw when it ran
#[derive(Debug, Clone)]
pub struct SynthesisCall {
    pub subject: String,
    pub inputs: SynthesisInputs,
    /// Tracked workers finished at the moment synthesis started
    pub finished_before: usize,
}

/// Synthesis worker that records its inputs and returns the present worker names
pub struct RecordingSynthesis {
    calls: Arc<Mutex<Vec<SynthesisCall>>>,
    tracker: Option<Arc<Tracker>>,
    should_fail: bool,
}

impl RecordingSynthesis {
    pub fn new() -> (Self, Arc<Mutex<Vec<SynthesisCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: calls.clone(),
                tracker: None,
                should_fail: false,
            },
            calls,
        )
    }

    pub fn with_tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl SynthesisWorker for RecordingSynthesis {
    fn name(&self) -> &str {
        "innovation_strategy"
    }

    fn slot_name(&self) -> &str {
        "innovation_opportunities"
    }

    fn display_name(&self) -> &str {
        "Innovation Strategy"
    }

    async fn synthesize(&self, subject: &str, inputs: &SynthesisInputs) -> Result<Value> {
        let finished_before = self.tracker.as_ref().map_or(0, |t| t.finished());
        self.calls.lock().push(SynthesisCall {
            subject: subject.to_string(),
            inputs: inputs.clone(),
            finished_before,
        });

        if self.should_fail {
            return Err(AppError::LLM("synthesis model unavailable".to_string()));
        }

        let present: Vec<&str> = inputs.present().map(|(name, _)| name).collect();
        Ok(json!(present))
    }
}
