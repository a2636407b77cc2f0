use crate::{
    AppState,
    types::{AnalysisRequest, AnalysisResponse, Result},
};
use axum::{Json, extract::State};
use std::time::Instant;

/// Analyze a molecule with every registered worker
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis completed; individual workers may have failed", body = AnalysisResponse),
        (status = 400, description = "No molecule could be determined from the request")
    ),
    tag = "analysis"
)]
pub async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>> {
    let start = Instant::now();

    let result = state.coordinator.analyze(&payload).await?;

    let duration = start.elapsed();
    Ok(Json(AnalysisResponse::from_result(
        &result,
        duration.as_millis() as u64,
    )))
}
