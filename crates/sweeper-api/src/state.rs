use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use sweeper_config::SweeperConfig;
use sweeper_pages::{CleanupOrchestrator, CleanupSummary};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Completed { summary: CleanupSummary },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunRecord {
    pub trigger: Trigger,
    pub finished_at: DateTime<Utc>,
    pub result: RunResult,
}

/// Shared between the HTTP handlers and the scheduler. At most one cleanup
/// runs at a time.
pub struct AppState {
    orchestrator: Arc<CleanupOrchestrator>,
    config: SweeperConfig,
    run_lock: Mutex<()>,
    last_run: RwLock<Option<RunRecord>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<CleanupOrchestrator>, config: SweeperConfig) -> Self {
        Self {
            orchestrator,
            config,
            run_lock: Mutex::new(()),
            last_run: RwLock::new(None),
        }
    }

    pub fn orchestrator(&self) -> &CleanupOrchestrator {
        &self.orchestrator
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    pub async fn last_run(&self) -> Option<RunRecord> {
        self.last_run.read().await.clone()
    }

    /// Runs a cleanup unless one is already in flight, and records the result.
    pub async fn run_cleanup(&self, trigger: Trigger) -> Result<CleanupSummary, ApiError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Skipping {:?} cleanup, a run is already in progress", trigger);
            return Err(ApiError::RunInProgress);
        };

        info!("Starting {:?} cleanup run", trigger);

        let result = self.orchestrator.cleanup().await;

        let recorded = match &result {
            Ok(summary) => RunResult::Completed {
                summary: summary.clone(),
            },
            Err(e) => RunResult::Failed {
                error: e.to_string(),
            },
        };

        *self.last_run.write().await = Some(RunRecord {
            trigger,
            finished_at: Utc::now(),
            result: recorded,
        });

        result.map_err(ApiError::from)
    }
}
