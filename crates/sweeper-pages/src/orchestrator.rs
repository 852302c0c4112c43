use crate::permissions::{CapabilityReport, check_permissions};
use crate::provider::PagesApi;
use crate::worker::{RetentionOutcome, RetentionPolicy, cleanup_project};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use utoipa::ToSchema;

/// Totals for one resource category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryOutcome {
    pub projects: usize,
    pub considered: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CleanupSummary {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub keep_count: usize,
    pub permissions: CapabilityReport,
    pub pages: CategoryOutcome,
    pub projects: Vec<RetentionOutcome>,
    pub total_deleted: usize,
    pub elapsed_ms: u64,
}

impl CleanupSummary {
    pub fn has_errors(&self) -> bool {
        !self.pages.errors.is_empty()
    }
}

pub struct CleanupOrchestrator {
    api: Arc<dyn PagesApi>,
    policy: RetentionPolicy,
    max_concurrent_projects: usize,
}

impl CleanupOrchestrator {
    pub fn new(
        api: Arc<dyn PagesApi>,
        policy: RetentionPolicy,
        max_concurrent_projects: usize,
    ) -> Self {
        Self {
            api,
            policy,
            max_concurrent_projects: max_concurrent_projects.max(1),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub async fn check_permissions(&self) -> CapabilityReport {
        check_permissions(self.api.as_ref()).await
    }

    /// Runs one full retention pass over every project.
    ///
    /// Fails only when the permission check or the initial project listing
    /// fails; every later problem ends up in the returned summary.
    pub async fn cleanup(&self) -> Result<CleanupSummary> {
        let started_at = Utc::now();
        let started = Instant::now();

        info!(
            "Starting Pages cleanup (keep {}, dry run: {})",
            self.policy.keep_count, self.policy.dry_run
        );

        let permissions = self.check_permissions().await;
        if !permissions.valid {
            error!(
                "Aborting cleanup, permission check failed: {}",
                permissions.reasons.join("; ")
            );
            return Err(Error::PermissionDenied {
                reasons: permissions.reasons,
            });
        }

        let projects = self.api.list_projects().await.inspect_err(|e| {
            error!("Aborting cleanup, failed to list projects: {}", e);
        })?;

        info!("Found {} Pages projects", projects.len());

        let policy = self.policy;
        // buffered() yields in input order, so outcomes line up with `projects`
        let outcomes: Vec<RetentionOutcome> = stream::iter(projects)
            .map(|project| {
                let api = self.api.clone();
                async move { cleanup_project(api.as_ref(), &project, policy).await }
            })
            .buffered(self.max_concurrent_projects)
            .collect()
            .await;

        let mut pages = CategoryOutcome {
            projects: outcomes.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            pages.considered += outcome.considered;
            pages.deleted += outcome.deleted;
            pages.errors.extend(outcome.errors.iter().cloned());
        }

        let summary = CleanupSummary {
            started_at,
            dry_run: self.policy.dry_run,
            keep_count: self.policy.keep_count,
            permissions,
            total_deleted: pages.deleted,
            pages,
            projects: outcomes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if summary.has_errors() {
            warn!(
                "Pages cleanup finished with {} error(s): {} deleted across {} projects in {}ms",
                summary.pages.errors.len(),
                summary.total_deleted,
                summary.pages.projects,
                summary.elapsed_ms
            );
        } else {
            info!(
                "Pages cleanup complete: {} deleted across {} projects in {}ms",
                summary.total_deleted, summary.pages.projects, summary.elapsed_ms
            );
        }

        Ok(summary)
    }
}
