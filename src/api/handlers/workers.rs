use crate::{AppState, workers::WorkerInfo};
use axum::{Json, extract::State};

/// List the registered workers, independent ones first in dispatch order
#[utoipa::path(
    get,
    path = "/api/workers",
    responses((status = 200, description = "Registered workers", body = [WorkerInfo])),
    tag = "workers"
)]
pub async fn list_workers(State(state): State<AppState>) -> Json<Vec<WorkerInfo>> {
    Json(state.coordinator.registry().describe())
}
