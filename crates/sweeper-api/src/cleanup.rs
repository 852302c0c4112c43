use crate::error::ApiError;
use crate::state::{AppState, RunRecord, Trigger};
use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use sweeper_pages::{CapabilityReport, CleanupSummary};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub keep_count: usize,
    pub dry_run: bool,
    pub interval_secs: u64,
    pub max_concurrent_projects: usize,
    pub running: bool,
    pub permissions: CapabilityReport,
    pub last_run: Option<RunRecord>,
}

#[utoipa::path(
    get,
    path = "/status",
    responses((status = OK, description = "Current configuration and last run", body = StatusResponse))
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let config = state.config();
    let policy = state.orchestrator().policy();

    Json(StatusResponse {
        keep_count: policy.keep_count,
        dry_run: policy.dry_run,
        interval_secs: config.interval_secs,
        max_concurrent_projects: config.max_concurrent_projects,
        running: state.is_running(),
        permissions: state.orchestrator().check_permissions().await,
        last_run: state.last_run().await,
    })
}

#[utoipa::path(
    post,
    path = "/cleanup",
    responses(
        (status = OK, description = "Cleanup finished", body = CleanupSummary),
        (status = FORBIDDEN, description = "Credentials cannot list projects"),
        (status = CONFLICT, description = "A cleanup run is already in progress"),
        (status = BAD_GATEWAY, description = "Project listing failed"),
    )
)]
pub async fn trigger_cleanup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CleanupSummary>, ApiError> {
    let summary = state.run_cleanup(Trigger::Manual).await?;
    Ok(Json(summary))
}
