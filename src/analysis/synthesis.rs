use super::invoker::CachedInvoker;
use super::scheduler::SettledBatch;
use crate::cache::Params;
use crate::types::WorkerResult;
use crate::workers::{SynthesisInputs, SynthesisWorker, QUERY_PARAM};
use std::sync::Arc;

/// Cache parameters for the synthesis worker.
///
/// Only whether each independent worker succeeded is encoded, never what it
/// produced. A cached synthesis is therefore reused while the success/failure
/// mix and the query stay the same, even if the underlying reports changed.
pub fn presence_fingerprint(query: &str, batch: &SettledBatch) -> Params {
    let mut params = Params::new();
    params.insert(QUERY_PARAM.to_string(), query.to_string());
    for (name, result) in batch.results() {
        params.insert(format!("has_{}", name), result.success.to_string());
    }
    params
}

/// Inputs handed to the synthesis worker: payloads of successes, `None` for failures
pub fn synthesis_inputs(query: &str, batch: &SettledBatch) -> SynthesisInputs {
    SynthesisInputs {
        query: query.to_string(),
        reports: batch
            .results()
            .iter()
            .map(|(name, result)| (name.clone(), result.report().cloned()))
            .collect(),
    }
}

/// The dependent stage. It can only be fed a [`SettledBatch`], so it never
/// sees a partially settled fan-out.
pub struct SynthesisStage {
    worker: Arc<dyn SynthesisWorker>,
    invoker: Arc<CachedInvoker>,
}

impl SynthesisStage {
    pub fn new(worker: Arc<dyn SynthesisWorker>, invoker: Arc<CachedInvoker>) -> Self {
        Self { worker, invoker }
    }

    pub fn display_name(&self) -> &str {
        self.worker.display_name()
    }

    pub async fn run(&self, subject: &str, query: &str, batch: &SettledBatch) -> WorkerResult {
        let params = presence_fingerprint(query, batch);
        let inputs = synthesis_inputs(query, batch);
        let worker = &self.worker;

        tracing::debug!(
            subject,
            present = inputs.present_count(),
            total = batch.len(),
            "Running synthesis stage"
        );

        self.invoker
            .run(worker.name(), worker.slot_name(), subject, &params, || {
                worker.synthesize(subject, &inputs)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch() -> SettledBatch {
        SettledBatch::from_results(vec![
            WorkerResult::success("patents", json!("patent report"), false),
            WorkerResult::failure("exim", "comtrade down"),
            WorkerResult::success("iqvia", json!("market report"), true),
        ])
    }

    #[test]
    fn test_fingerprint_encodes_presence_only() {
        let params = presence_fingerprint("outlook", &batch());

        assert_eq!(params["query"], "outlook");
        assert_eq!(params["has_patents"], "true");
        assert_eq!(params["has_exim"], "false");
        assert_eq!(params["has_iqvia"], "true");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_fingerprint_ignores_report_content() {
        let other = SettledBatch::from_results(vec![
            WorkerResult::success("patents", json!("a completely different report"), false),
            WorkerResult::failure("exim", "another error"),
            WorkerResult::success("iqvia", json!("new market data"), false),
        ]);
        assert_eq!(
            presence_fingerprint("outlook", &batch()),
            presence_fingerprint("outlook", &other)
        );
    }

    #[test]
    fn test_inputs_mark_failures_absent() {
        let inputs = synthesis_inputs("outlook", &batch());
        assert_eq!(inputs.reports.len(), 3);
        assert_eq!(inputs.reports["patents"], Some(json!("patent report")));
        assert_eq!(inputs.reports["exim"], None);
        assert_eq!(inputs.present_count(), 2);
    }
}
