use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

// ============= API Request/Response Types =============

fn default_geography() -> String {
    "Global".to_string()
}

/// An analysis request as accepted by the request boundary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    /// Free-text query; the subject is extracted from it when `molecule` is absent
    pub query: String,
    /// Explicit subject, takes precedence over extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub molecule: Option<String>,
    #[serde(default = "default_geography")]
    pub geography: String,
}

impl AnalysisRequest {
    /// Request with only free text; the subject will be resolved from it
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            molecule: None,
            geography: default_geography(),
        }
    }

    /// Set an explicit subject
    pub fn with_molecule(mut self, molecule: impl Into<String>) -> Self {
        self.molecule = Some(molecule.into());
        self
    }

    /// Set the geography of interest
    pub fn with_geography(mut self, geography: impl Into<String>) -> Self {
        self.geography = geography.into();
        self
    }
}

/// One worker slot in the API response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportSlot {
    pub success: bool,
    #[schema(value_type = Option<Object>)]
    pub report: Option<Value>,
    pub error: Option<String>,
    pub cached: bool,
}

impl From<&WorkerResult> for ReportSlot {
    fn from(result: &WorkerResult) -> Self {
        Self {
            success: result.success,
            report: result.payload.clone(),
            error: result.error.clone(),
            cached: result.served_from_cache,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    pub success: bool,
    pub molecule: String,
    pub geography: String,
    /// One slot per independent worker plus one for the synthesis worker, keyed by name
    pub results: BTreeMap<String, ReportSlot>,
    pub updates: Vec<AgentUpdate>,
    pub duration_ms: u64,
}

impl AnalysisResponse {
    pub fn from_result(result: &AnalysisResult, duration_ms: u64) -> Self {
        let mut results: BTreeMap<String, ReportSlot> = result
            .workers
            .iter()
            .map(|(name, r)| (name.clone(), ReportSlot::from(r)))
            .collect();
        results.insert(
            result.synthesis.worker_name.clone(),
            ReportSlot::from(&result.synthesis),
        );

        Self {
            success: true,
            molecule: result.subject.clone(),
            geography: result.geography.clone(),
            results,
            updates: result.updates.clone(),
            duration_ms,
        }
    }
}

// ============= Progress Timeline =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Running,
    Completed,
    Error,
}

/// A single progress entry, rendered as a timeline by clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentUpdate {
    pub agent: String,
    pub status: UpdateStatus,
    pub message: String,
}

impl AgentUpdate {
    pub fn new(agent: impl Into<String>, status: UpdateStatus, message: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            status,
            message: message.into(),
        }
    }
}

// ============= Worker Results =============

/// Outcome of one worker for one request.
///
/// `payload` is present iff `success`; `error` is present iff `!success`.
/// Use [`WorkerResult::success`] and [`WorkerResult::failure`] to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkerResult {
    pub worker_name: String,
    pub success: bool,
    #[schema(value_type = Option<Object>)]
    pub payload: Option<Value>,
    pub error: Option<String>,
    pub served_from_cache: bool,
}

impl WorkerResult {
    pub fn success(worker_name: impl Into<String>, payload: Value, served_from_cache: bool) -> Self {
        Self {
            worker_name: worker_name.into(),
            success: true,
            payload: Some(payload),
            error: None,
            served_from_cache,
        }
    }

    pub fn failure(worker_name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "worker failed without an error message".to_string();
        }
        Self {
            worker_name: worker_name.into(),
            success: false,
            payload: None,
            error: Some(error),
            served_from_cache: false,
        }
    }

    /// Payload of a successful worker, `None` for failures
    pub fn report(&self) -> Option<&Value> {
        if self.success {
            self.payload.as_ref()
        } else {
            None
        }
    }
}

/// Aggregate of every worker result produced for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub subject: String,
    pub query: String,
    pub geography: String,
    /// Independent worker results, addressed by worker name
    pub workers: BTreeMap<String, WorkerResult>,
    pub synthesis: WorkerResult,
    pub updates: Vec<AgentUpdate>,
}

impl AnalysisResult {
    pub fn succeeded(&self) -> usize {
        self.workers.values().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.workers.len() - self.succeeded()
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Could not determine a molecule: {0}")]
    Resolution(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Source(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Resolution(_) | AppError::InvalidInput(_) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_worker_result_invariants() {
        let ok = WorkerResult::success("patents", json!("report"), false);
        assert!(ok.success);
        assert_eq!(ok.report(), Some(&json!("report")));
        assert!(ok.error.is_none());

        let failed = WorkerResult::failure("patents", "boom");
        assert!(!failed.success);
        assert!(failed.payload.is_none());
        assert!(failed.report().is_none());
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(!failed.served_from_cache);
    }

    #[test]
    fn test_failure_never_has_empty_error() {
        let failed = WorkerResult::failure("exim", "   ");
        assert!(!failed.error.unwrap().trim().is_empty());
    }

    #[test]
    fn test_error_status_codes() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let status = |err: AppError| err.into_response().status();
        assert_eq!(status(AppError::Resolution("no molecule".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::InvalidInput("empty query".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::Cache("disk full".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(AppError::LLM("timeout".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_request_defaults_geography() {
        let req: AnalysisRequest = serde_json::from_value(json!({"query": "Metformin"})).unwrap();
        assert_eq!(req.geography, "Global");
        assert!(req.molecule.is_none());
    }

    #[test]
    fn test_response_includes_synthesis_slot() {
        let mut workers = BTreeMap::new();
        workers.insert(
            "iqvia".to_string(),
            WorkerResult::success("iqvia", json!("market"), true),
        );
        let result = AnalysisResult {
            subject: "Metformin".to_string(),
            query: "Metformin".to_string(),
            geography: "Global".to_string(),
            workers,
            synthesis: WorkerResult::failure("innovation_opportunities", "llm down"),
            updates: vec![],
        };

        let response = AnalysisResponse::from_result(&result, 12);
        assert_eq!(response.results.len(), 2);
        assert!(response.results["iqvia"].cached);
        assert!(!response.results["innovation_opportunities"].success);
        assert_eq!(response.molecule, "Metformin");
    }
}
