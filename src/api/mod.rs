//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for molecule-insight, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Service
//! - `GET /` - Service banner
//! - `GET /health` - Health check endpoint
//!
//! ## Analysis (`/api/analyze`)
//! - `POST /api/analyze` - Run every worker for one molecule and synthesize the results
//!
//! ## Cache (`/api/cache`)
//! - `GET /api/cache/info` - List cached entries and hit/miss statistics
//! - `POST /api/cache/clear` - Remove every cached entry
//! - `POST /api/cache/clear-expired` - Remove expired entries only
//!
//! ## Workers (`/api/workers`)
//! - `GET /api/workers` - List the registered workers
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::cache::{CacheItemInfo, CacheStats};
use crate::types::{AgentUpdate, AnalysisRequest, AnalysisResponse, ReportSlot, UpdateStatus};
use crate::workers::WorkerInfo;
use utoipa::OpenApi;

/// OpenAPI document for the HTTP API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "molecule-insight",
        description = "Concurrent, cached intelligence gathering for chemical compounds"
    ),
    paths(
        handlers::health::root,
        handlers::health::health,
        handlers::analysis::analyze,
        handlers::cache::cache_info,
        handlers::cache::clear_cache,
        handlers::cache::clear_expired,
        handlers::workers::list_workers,
    ),
    components(schemas(
        AnalysisRequest,
        AnalysisResponse,
        ReportSlot,
        AgentUpdate,
        UpdateStatus,
        CacheItemInfo,
        CacheStats,
        WorkerInfo,
        handlers::health::ServiceInfo,
        handlers::health::HealthStatus,
        handlers::cache::CacheInfoResponse,
        handlers::cache::CacheClearResponse,
    )),
    tags(
        (name = "service", description = "Service status"),
        (name = "analysis", description = "Molecule analysis"),
        (name = "cache", description = "Worker cache administration"),
        (name = "workers", description = "Worker registry"),
    )
)]
pub struct ApiDoc;
