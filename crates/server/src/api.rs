//! Automation and health endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::error;
use utoipa::OpenApi;

use adpilot_rules::{BatchOutcome, BatchSummary};

use crate::state::AppState;

pub const PROCESSING_COMPLETE: &str = "Automation rule processing complete";
pub const NO_ACTIVE_RULES: &str = "No active rules found";

// ── Response types ─────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Counts for a completed batch pass.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProcessSummary {
    pub message: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// RFC 3339 with millisecond precision.
    pub timestamp: String,
}

impl From<&BatchSummary> for ProcessSummary {
    fn from(summary: &BatchSummary) -> Self {
        Self {
            message: PROCESSING_COMPLETE.to_string(),
            total: summary.total,
            successful: summary.successful,
            failed: summary.failed,
            timestamp: summary.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NothingToProcess {
    pub message: String,
    pub processed: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum ProcessResponse {
    Completed(ProcessSummary),
    Empty(NothingToProcess),
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether a PostgreSQL store is available.
    pub database: bool,
}

// ── Endpoints ─────────────────────────────────────────────────

/// Run one batch pass over every active automation rule.
///
/// Also reachable with `GET`. No request body is read.
#[utoipa::path(
    post,
    path = "/process-automation-rules",
    tag = "Automation",
    responses(
        (status = 200, description = "Batch finished, or no active rules", body = ProcessResponse),
        (status = 500, description = "Store not configured or rule query failed", body = ErrorResponse)
    )
)]
pub async fn process_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let runner = state.runner().map_err(|reason| {
        error!(reason, "Automation store unavailable");
        internal_error(reason)
    })?;

    match runner.run().await {
        Ok(BatchOutcome::NoActiveRules { .. }) => {
            Ok(Json(ProcessResponse::Empty(NothingToProcess {
                message: NO_ACTIVE_RULES.to_string(),
                processed: 0,
            })))
        }
        Ok(BatchOutcome::Completed(summary)) => {
            Ok(Json(ProcessResponse::Completed(ProcessSummary::from(&summary))))
        }
        Err(e) => {
            error!(error = %e, "Error in automation rule processing");
            Err(internal_error(e.to_string()))
        }
    }
}

/// Liveness and store readiness.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: state.database_ready(),
    })
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "adpilot API",
        description = "Marketing automation rule engine.",
    ),
    tags(
        (name = "Automation", description = "Batch evaluation of automation rules"),
        (name = "Health", description = "Server readiness"),
    ),
    paths(process_rules, health),
    components(schemas(
        ProcessResponse,
        ProcessSummary,
        NothingToProcess,
        ErrorResponse,
        HealthResponse,
    ))
)]
pub struct ApiDoc;
