//! Data-gathering workers
//!
//! A [`Worker`] turns `(subject, parameters)` into a report payload. It may
//! call remote services and the LLM, and it may fail, but it never touches
//! orchestration state: running the same worker twice with the same inputs
//! is always safe.
//!
//! The set of workers is fixed at startup in a [`WorkerRegistry`]; nothing is
//! discovered at runtime. One [`SynthesisWorker`] per registry consumes the
//! settled outputs of all the independent workers.

pub mod clinical_trials;
pub mod exim;
pub mod innovation;
pub mod internal_knowledge;
pub mod market;
pub mod patents;
pub mod web_intel;

pub use clinical_trials::ClinicalTrialsWorker;
pub use exim::EximWorker;
pub use innovation::InnovationStrategyWorker;
pub use internal_knowledge::InternalKnowledgeWorker;
pub use market::MarketInsightsWorker;
pub use patents::PatentWorker;
pub use web_intel::WebIntelWorker;

use crate::cache::Params;
use crate::llm::LLMClient;
use crate::sources::Sources;
use crate::types::{AppError, Result};
use crate::utils::toml_config::WorkersConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// Parameter carrying the free-text query context
pub const QUERY_PARAM: &str = "query";

/// Names of the independent workers built by [`WorkerRegistry::with_default_workers`]
pub const STANDARD_WORKERS: &[&str] = &[
    "iqvia",
    "clinical_trials",
    "patents",
    "exim",
    "web_intel",
    "internal_knowledge",
];

/// An independent data-gathering worker
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable identifier, used as the cache namespace and result key
    fn name(&self) -> &str;

    /// Human-readable name for progress updates
    fn display_name(&self) -> &str;

    fn description(&self) -> &str;

    /// Worker-specific arguments merged into the cache parameters
    fn default_args(&self) -> Params {
        Params::new()
    }

    /// Produce a report for `subject`. `params` holds the query context and
    /// the worker's arguments.
    async fn invoke(&self, subject: &str, params: &Params) -> Result<Value>;
}

/// Settled outputs of the independent stage, as seen by the synthesis worker
#[derive(Debug, Clone, Default)]
pub struct SynthesisInputs {
    pub query: String,
    /// Every independent worker by name; `None` when it failed
    pub reports: BTreeMap<String, Option<Value>>,
}

impl SynthesisInputs {
    /// Reports that are present, in worker-name order
    pub fn present(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.reports
            .iter()
            .filter_map(|(name, report)| report.as_ref().map(|r| (name.as_str(), r)))
    }

    pub fn present_count(&self) -> usize {
        self.present().count()
    }
}

/// The dependent worker run after the independent stage settles
#[async_trait]
pub trait SynthesisWorker: Send + Sync {
    /// Stable identifier, used as the cache namespace
    fn name(&self) -> &str;

    /// Key of this worker's slot in the aggregated result
    fn slot_name(&self) -> &str {
        self.name()
    }

    fn display_name(&self) -> &str;

    /// Must degrade to a reduced-scope result when some inputs are absent
    async fn synthesize(&self, subject: &str, inputs: &SynthesisInputs) -> Result<Value>;
}

/// A worker plus the static arguments it runs with
#[derive(Clone)]
pub struct RegisteredWorker {
    pub worker: Arc<dyn Worker>,
    pub args: Params,
}

impl RegisteredWorker {
    pub fn name(&self) -> &str {
        self.worker.name()
    }
}

/// Description of a registered worker, for listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkerInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// `independent` or `synthesis`
    pub kind: String,
    pub args: BTreeMap<String, String>,
}

/// Static, ordered table of the workers a coordinator runs
#[derive(Clone)]
pub struct WorkerRegistry {
    workers: Vec<RegisteredWorker>,
    synthesis: Arc<dyn SynthesisWorker>,
}

impl WorkerRegistry {
    pub fn new(synthesis: Arc<dyn SynthesisWorker>) -> Self {
        Self {
            workers: Vec::new(),
            synthesis,
        }
    }

    /// Build the standard worker set, honoring `[workers.<name>]` overrides
    pub fn with_default_workers(
        llm: Arc<dyn LLMClient>,
        sources: &Sources,
        config: &WorkersConfig,
    ) -> Result<Self> {
        let defaults: Vec<Arc<dyn Worker>> = vec![
            Arc::new(MarketInsightsWorker::new(llm.clone(), sources.clone())),
            Arc::new(ClinicalTrialsWorker::new(
                llm.clone(),
                sources.clinical_trials.clone(),
            )),
            Arc::new(PatentWorker::new(llm.clone(), sources.patents.clone())),
            Arc::new(EximWorker::new(llm.clone(), sources.comtrade.clone())),
            Arc::new(WebIntelWorker::new(llm.clone(), sources.news.clone())),
            Arc::new(InternalKnowledgeWorker::new(llm.clone())),
        ];

        for name in config.keys() {
            if !defaults.iter().any(|w| w.name() == name) {
                return Err(AppError::Config(format!("Unknown worker in [workers]: {}", name)));
            }
        }

        let mut registry = Self::new(Arc::new(InnovationStrategyWorker::new(llm)));
        for worker in defaults {
            match config.get(worker.name()) {
                Some(settings) if !settings.enabled => {
                    tracing::info!(worker = worker.name(), "Worker disabled by configuration");
                }
                Some(settings) => {
                    registry.register_with_args(worker, settings.args.clone());
                }
                None => {
                    registry.register(worker);
                }
            }
        }

        Ok(registry)
    }

    /// Register a worker with its default arguments
    pub fn register(&mut self, worker: Arc<dyn Worker>) -> &mut Self {
        self.register_with_args(worker, Params::new())
    }

    /// Register a worker with `overrides` layered over its default arguments.
    /// A worker registered under an existing name replaces it in place.
    pub fn register_with_args(&mut self, worker: Arc<dyn Worker>, overrides: Params) -> &mut Self {
        let mut args = worker.default_args();
        args.extend(overrides);
        args.remove(QUERY_PARAM);

        let entry = RegisteredWorker { worker, args };
        match self.workers.iter_mut().find(|w| w.name() == entry.name()) {
            Some(existing) => *existing = entry,
            None => self.workers.push(entry),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredWorker> {
        self.workers.iter().find(|w| w.name() == name)
    }

    pub fn workers(&self) -> &[RegisteredWorker] {
        &self.workers
    }

    pub fn names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }

    pub fn synthesis(&self) -> &Arc<dyn SynthesisWorker> {
        &self.synthesis
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn describe(&self) -> Vec<WorkerInfo> {
        let mut infos: Vec<WorkerInfo> = self
            .workers
            .iter()
            .map(|w| WorkerInfo {
                name: w.name().to_string(),
                display_name: w.worker.display_name().to_string(),
                description: w.worker.description().to_string(),
                kind: "independent".to_string(),
                args: w.args.clone(),
            })
            .collect();

        infos.push(WorkerInfo {
            name: self.synthesis.slot_name().to_string(),
            display_name: self.synthesis.display_name().to_string(),
            description: "Combines the independent reports into innovation opportunities"
                .to_string(),
            kind: "synthesis".to_string(),
            args: BTreeMap::new(),
        });
        infos
    }
}

// ============= Shared helpers =============

/// The query context carried in the parameters, if any
pub(crate) fn query_context(params: &Params) -> Option<&str> {
    params
        .get(QUERY_PARAM)
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
}

pub(crate) fn count<K: Into<String>>(counts: &mut BTreeMap<String, usize>, key: K) {
    *counts.entry(key.into()).or_insert(0) += 1;
}

/// The `n` largest counts, ties broken alphabetically
pub(crate) fn top_counts(counts: &BTreeMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Pretty JSON for embedding aggregated data in a prompt
pub(crate) fn to_prompt_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Text form of a report payload
pub fn report_text(report: &Value) -> String {
    match report {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) const ANALYST_SYSTEM_PROMPT: &str = "You are a pharmaceutical intelligence analyst. \
Write factual, structured markdown reports. Only use numbers present in the data you are given; \
when the data is empty, say so plainly instead of guessing.";
