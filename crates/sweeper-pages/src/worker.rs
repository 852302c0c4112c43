use crate::policy::compute_delete_set;
use crate::provider::{PagesApi, Project};
use serde::Serialize;
use sweeper_config::constants;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_count: usize,
    pub dry_run: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_count: constants::DEFAULT_KEEP_COUNT,
            dry_run: false,
        }
    }
}

/// What happened to one project during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RetentionOutcome {
    pub project: String,
    pub considered: usize,
    pub planned: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RetentionOutcome {
    fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            ..Default::default()
        }
    }
}

/// Applies the retention policy to one project.
///
/// Never fails: a listing error or a failed delete is recorded in the
/// outcome and the remaining work carries on.
pub async fn cleanup_project(
    api: &dyn PagesApi,
    project: &Project,
    policy: RetentionPolicy,
) -> RetentionOutcome {
    let mut outcome = RetentionOutcome::new(&project.name);

    let raw = match api.list_deployments(&project.name).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to list deployments for {}: {}", project.name, e);
            outcome.errors.push(format!(
                "{}: failed to list deployments: {}",
                project.name, e
            ));
            return outcome;
        }
    };

    let plan = compute_delete_set(&raw, policy.keep_count);

    for warning in &plan.warnings {
        warn!("Project {}: {}", project.name, warning);
        outcome.warnings.push(warning.to_string());
    }

    if plan.considered == 0 {
        debug!("No deployments found for project {}", project.name);
        return outcome;
    }

    outcome.considered = plan.considered;
    outcome.planned = plan.to_delete.len();

    info!(
        "Project {}: {} deployments, {} successful, {} to delete (keeping {})",
        project.name,
        plan.considered,
        plan.candidates,
        plan.to_delete.len(),
        policy.keep_count
    );

    for deployment in &plan.to_delete {
        if policy.dry_run {
            info!(
                "Dry run: would delete deployment {} of {} (created {})",
                deployment.display_id(),
                project.name,
                deployment.created_on.as_deref().unwrap_or("unknown")
            );
            continue;
        }

        match api.delete_deployment(&project.name, &deployment.id).await {
            Ok(()) => {
                info!(
                    "Deleted deployment {} of {}",
                    deployment.display_id(),
                    project.name
                );
                outcome.deleted += 1;
            }
            Err(e) => {
                error!(
                    "Failed to delete deployment {} of {}: {}",
                    deployment.display_id(),
                    project.name,
                    e
                );
                outcome.errors.push(format!(
                    "{}: failed to delete deployment {}: {}",
                    project.name,
                    deployment.display_id(),
                    e
                ));
            }
        }
    }

    outcome
}
