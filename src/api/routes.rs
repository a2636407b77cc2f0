use crate::AppState;
use crate::api::handlers::{analysis, cache, health, workers};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Routes under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analysis::analyze))
        .route("/cache/info", get(cache::cache_info))
        .route("/cache/clear", post(cache::clear_cache))
        .route("/cache/clear-expired", post(cache::clear_expired))
        .route("/workers", get(workers::list_workers))
}

/// The complete application router with CORS, tracing and, when enabled, Swagger UI
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/api", create_router());

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", crate::api::ApiDoc::openapi()),
        )
    };

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
