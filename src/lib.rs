//! # MoleculeInsight
//!
//! Concurrent, cached intelligence gathering for chemical compounds.
//!
//! A request names a molecule (explicitly or inside free text). Several
//! independent workers each query a remote data source, aggregate what they
//! find and ask an LLM for a narrative report. A dependent synthesis worker
//! then turns whichever reports succeeded into a list of innovation
//! opportunities.
//!
//! MoleculeInsight can be used in two ways:
//!
//! 1. **As a standalone server or CLI** - Run the `molecule-insight` binary
//! 2. **As a library** - Embed the [`AnalysisCoordinator`] in your own service
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use molecule_insight::{AppState, ConfigManager};
//! use molecule_insight::types::AnalysisRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::from_config(ConfigManager::new("molecule-insight.toml")?)?;
//!
//!     let request = AnalysisRequest::from_query("Patent landscape of Metformin");
//!     let result = state.coordinator.analyze(&request).await?;
//!     println!("{}/{} workers succeeded", result.succeeded(), result.workers.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Workers
//!
//! ```rust,ignore
//! use molecule_insight::{AnalysisCoordinator, WorkerRegistry};
//! use molecule_insight::analysis::InvokerConfig;
//! use std::sync::Arc;
//!
//! let mut registry = WorkerRegistry::new(Arc::new(my_synthesis));
//! registry.register(Arc::new(my_worker));
//! let coordinator = AnalysisCoordinator::new(registry, cache, InvokerConfig::default());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API and compatible endpoints |
//! | `swagger-ui` | Interactive API documentation at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`analysis`] - Subject resolution, fan-out scheduling, caching invoker, synthesis
//! - [`cache`] - Time-bounded worker output cache
//! - [`workers`] - Worker contract, registry and the standard workers
//! - [`sources`] - HTTP clients for the remote data sources
//! - [`llm`] - LLM client implementations
//! - [`api`] - REST API handlers and routes
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Request orchestration: resolver, scheduler, invoker and synthesis stage.
pub mod analysis;
/// HTTP API handlers and routes.
pub mod api;
/// Worker output cache.
pub mod cache;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Remote data source clients.
pub mod sources;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;
/// Worker contract, registry and standard workers.
pub mod workers;

// Re-export commonly used types
pub use analysis::AnalysisCoordinator;
pub use cache::{CacheStore, FileCacheStore};
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use types::{AppError, Result};
pub use utils::toml_config::{AppConfig, ConfigManager};
pub use workers::{SynthesisWorker, Worker, WorkerRegistry};

use crate::sources::Sources;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration the state was built from
    pub config_manager: Arc<ConfigManager>,
    /// The request orchestrator, built once from the startup configuration
    pub coordinator: Arc<AnalysisCoordinator>,
}

impl AppState {
    pub fn new(config_manager: Arc<ConfigManager>, coordinator: Arc<AnalysisCoordinator>) -> Self {
        Self {
            config_manager,
            coordinator,
        }
    }

    /// Build the LLM client, source clients, worker registry, cache and
    /// coordinator from the current configuration.
    pub fn from_config(config_manager: ConfigManager) -> Result<Self> {
        let config = config_manager.config();

        let provider = config.llm.to_provider()?;
        tracing::info!(provider = provider.name(), model = provider.model(), "Using LLM provider");
        let llm = LLMClientFactory::new(provider).create_default()?;

        let sources = Sources::from_config(&config.sources)?;
        let registry = WorkerRegistry::with_default_workers(llm, &sources, &config.workers)?;
        let cache = cache::build_cache(config.cache.to_cache_config())?;
        let coordinator = AnalysisCoordinator::new(registry, cache, config.invoker_config());

        Ok(Self::new(Arc::new(config_manager), Arc::new(coordinator)))
    }
}
