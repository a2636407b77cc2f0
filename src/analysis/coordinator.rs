use super::invoker::{CachedInvoker, InvokerConfig};
use super::resolver::SubjectResolver;
use super::scheduler::FanOutScheduler;
use super::synthesis::SynthesisStage;
use crate::cache::CacheStore;
use crate::types::{AgentUpdate, AnalysisRequest, AnalysisResult, Result, UpdateStatus};
use crate::workers::WorkerRegistry;
use std::sync::Arc;

const COORDINATOR: &str = "Coordinator";

/// Runs one analysis request end to end: resolve the subject, fan out the
/// independent workers, then run the synthesis stage on the settled batch.
///
/// Built once at startup. The cache and the worker pool it owns are shared by
/// every request.
pub struct AnalysisCoordinator {
    resolver: SubjectResolver,
    registry: Arc<WorkerRegistry>,
    invoker: Arc<CachedInvoker>,
    scheduler: FanOutScheduler,
    synthesis: SynthesisStage,
}

impl AnalysisCoordinator {
    pub fn new(registry: WorkerRegistry, cache: Arc<dyn CacheStore>, config: InvokerConfig) -> Self {
        let registry = Arc::new(registry);
        let invoker = Arc::new(CachedInvoker::new(cache, config));

        tracing::info!(
            workers = registry.len(),
            max_workers = invoker.max_workers(),
            "Analysis coordinator ready"
        );

        Self {
            resolver: SubjectResolver::default(),
            scheduler: FanOutScheduler::new(registry.clone(), invoker.clone()),
            synthesis: SynthesisStage::new(registry.synthesis().clone(), invoker.clone()),
            registry,
            invoker,
        }
    }

    pub fn with_resolver(mut self, resolver: SubjectResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        self.invoker.cache()
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &SubjectResolver {
        &self.resolver
    }

    pub fn invoker(&self) -> &CachedInvoker {
        &self.invoker
    }

    /// Analyze one request.
    ///
    /// Fails only when no subject can be determined. Worker failures are
    /// reported in their own slots of the returned result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let subject = self
            .resolver
            .resolve_subject(request.molecule.as_deref(), &request.query)?;
        let query = request.query.trim();

        tracing::info!(subject = %subject, geography = %request.geography, "Starting analysis");

        let mut updates = vec![AgentUpdate::new(
            COORDINATOR,
            UpdateStatus::Running,
            format!("Analyzing {} ({})", subject, request.geography),
        )];

        let batch = self.scheduler.run(&subject, query).await;
        updates.extend_from_slice(batch.timeline());

        updates.push(AgentUpdate::new(
            self.synthesis.display_name(),
            UpdateStatus::Running,
            format!(
                "Synthesizing {} of {} reports",
                batch.succeeded(),
                batch.len()
            ),
        ));
        let synthesis = self.synthesis.run(&subject, query, &batch).await;
        updates.push(if synthesis.success {
            AgentUpdate::new(
                self.synthesis.display_name(),
                UpdateStatus::Completed,
                "Innovation opportunities identified",
            )
        } else {
            AgentUpdate::new(
                self.synthesis.display_name(),
                UpdateStatus::Error,
                synthesis.error.clone().unwrap_or_default(),
            )
        });

        let succeeded = batch.succeeded();
        let total = batch.len();
        updates.push(AgentUpdate::new(
            COORDINATOR,
            UpdateStatus::Completed,
            format!("Analysis complete: {}/{} workers succeeded", succeeded, total),
        ));

        tracing::info!(subject = %subject, succeeded, total, synthesis = synthesis.success, "Analysis complete");

        let (workers, _) = batch.into_parts();
        Ok(AnalysisResult {
            subject,
            query: query.to_string(),
            geography: request.geography.clone(),
            workers,
            synthesis,
            updates,
        })
    }
}
