use super::invoker::CachedInvoker;
use crate::cache::Params;
use crate::types::{AgentUpdate, UpdateStatus, WorkerResult};
use crate::workers::{WorkerRegistry, QUERY_PARAM};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Cache parameters for one worker call: its static arguments plus the query
pub fn cache_params(args: &Params, query: &str) -> Params {
    let mut params = args.clone();
    params.insert(QUERY_PARAM.to_string(), query.to_string());
    params
}

/// The complete outcome of one fan-out batch.
///
/// Only [`FanOutScheduler::run`] can build one, and it does so after every
/// worker has settled, so holding a `SettledBatch` proves the batch is done.
#[derive(Debug, Clone)]
pub struct SettledBatch {
    results: BTreeMap<String, WorkerResult>,
    timeline: Vec<AgentUpdate>,
}

impl SettledBatch {
    /// One result per registered worker, addressed by name
    pub fn results(&self) -> &BTreeMap<String, WorkerResult> {
        &self.results
    }

    pub fn get(&self, worker: &str) -> Option<&WorkerResult> {
        self.results.get(worker)
    }

    /// Dispatch and settle updates, in the order they happened
    pub fn timeline(&self) -> &[AgentUpdate] {
        &self.timeline
    }

    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_results(results: Vec<WorkerResult>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|r| (r.worker_name.clone(), r))
                .collect(),
            timeline: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (BTreeMap<String, WorkerResult>, Vec<AgentUpdate>) {
        (self.results, self.timeline)
    }
}

/// Runs every registered worker concurrently and waits for all of them
pub struct FanOutScheduler {
    registry: Arc<WorkerRegistry>,
    invoker: Arc<CachedInvoker>,
}

impl FanOutScheduler {
    pub fn new(registry: Arc<WorkerRegistry>, invoker: Arc<CachedInvoker>) -> Self {
        Self { registry, invoker }
    }

    /// Dispatch the whole batch at once and wait for every worker to settle.
    ///
    /// A failing worker only affects its own slot. Dropping the returned
    /// future aborts workers that are still running.
    pub async fn run(&self, subject: &str, query: &str) -> SettledBatch {
        let mut tasks = JoinSet::new();
        let mut timeline = Vec::with_capacity(self.registry.len() * 2);

        for registered in self.registry.workers() {
            let worker = registered.worker.clone();
            let invoker = self.invoker.clone();
            let params = cache_params(&registered.args, query);
            let subject = subject.to_string();

            timeline.push(AgentUpdate::new(
                worker.display_name(),
                UpdateStatus::Running,
                format!("Analyzing {}...", subject),
            ));

            tasks.spawn(async move {
                let name = worker.name().to_string();
                let result = invoker
                    .run(&name, &name, &subject, &params, || {
                        worker.invoke(&subject, &params)
                    })
                    .await;
                (name, result)
            });
        }

        tracing::debug!(subject, workers = self.registry.len(), "Fan-out dispatched");

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    timeline.push(self.settle_update(&name, &result));
                    results.insert(name, result);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Worker task did not complete");
                }
            }
        }

        // A task that died outside the invoker still gets a slot
        for registered in self.registry.workers() {
            let name = registered.name();
            if !results.contains_key(name) {
                let result = WorkerResult::failure(name, "worker task terminated unexpectedly");
                timeline.push(self.settle_update(name, &result));
                results.insert(name.to_string(), result);
            }
        }

        let batch = SettledBatch { results, timeline };
        tracing::info!(
            subject,
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            "Fan-out settled"
        );
        batch
    }

    fn settle_update(&self, name: &str, result: &WorkerResult) -> AgentUpdate {
        let display = self
            .registry
            .get(name)
            .map(|w| w.worker.display_name().to_string())
            .unwrap_or_else(|| name.to_string());

        if result.success {
            let message = if result.served_from_cache {
                "Completed (cached)".to_string()
            } else {
                "Completed".to_string()
            };
            AgentUpdate::new(display, UpdateStatus::Completed, message)
        } else {
            AgentUpdate::new(
                display,
                UpdateStatus::Error,
                result.error.clone().unwrap_or_default(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_params_include_query_and_args() {
        let args = Params::from([("hs_code".to_string(), "300490".to_string())]);
        let params = cache_params(&args, "export outlook");

        assert_eq!(params.len(), 2);
        assert_eq!(params["query"], "export outlook");
        assert_eq!(params["hs_code"], "300490");
    }

    #[test]
    fn test_distinct_queries_give_distinct_params() {
        let args = Params::new();
        assert_ne!(cache_params(&args, "a"), cache_params(&args, "b"));
    }
}
