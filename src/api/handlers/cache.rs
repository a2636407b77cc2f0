use crate::{
    AppState,
    cache::{CacheItemInfo, CacheStats},
};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CacheInfoResponse {
    pub success: bool,
    pub enabled: bool,
    pub ttl_hours: f64,
    pub cache_count: usize,
    pub cache_items: Vec<CacheItemInfo>,
    pub stats: CacheStats,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CacheClearResponse {
    pub success: bool,
    pub cleared: usize,
    pub message: String,
}

/// List cached entries
#[utoipa::path(
    get,
    path = "/api/cache/info",
    responses((status = 200, description = "Cached entries and statistics", body = CacheInfoResponse)),
    tag = "cache"
)]
pub async fn cache_info(State(state): State<AppState>) -> Json<CacheInfoResponse> {
    let cache = state.coordinator.cache();
    let items = cache.info().await;

    Json(CacheInfoResponse {
        success: true,
        enabled: cache.is_enabled(),
        ttl_hours: cache.ttl().as_secs_f64() / 3600.0,
        cache_count: items.len(),
        cache_items: items,
        stats: cache.stats(),
    })
}

/// Remove every cached entry
#[utoipa::path(
    post,
    path = "/api/cache/clear",
    responses((status = 200, description = "Cache cleared", body = CacheClearResponse)),
    tag = "cache"
)]
pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearResponse> {
    let cleared = state.coordinator.cache().clear_all().await;
    tracing::info!(cleared, "Cache cleared via API");

    Json(CacheClearResponse {
        success: true,
        cleared,
        message: format!("Cleared {} cache files", cleared),
    })
}

/// Remove expired entries only
#[utoipa::path(
    post,
    path = "/api/cache/clear-expired",
    responses((status = 200, description = "Expired entries removed", body = CacheClearResponse)),
    tag = "cache"
)]
pub async fn clear_expired(State(state): State<AppState>) -> Json<CacheClearResponse> {
    let cleared = state.coordinator.cache().prune_expired().await;
    tracing::info!(cleared, "Expired cache entries cleared via API");

    Json(CacheClearResponse {
        success: true,
        cleared,
        message: format!("Cleared {} expired cache files", cleared),
    })
}
