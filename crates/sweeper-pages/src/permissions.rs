use crate::provider::PagesApi;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Capabilities {
    pub can_list_projects: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CapabilityReport {
    pub valid: bool,
    pub capabilities: Capabilities,
    pub reasons: Vec<String>,
}

/// Probes the credentials with a read-only project listing.
pub async fn check_permissions(api: &dyn PagesApi) -> CapabilityReport {
    let mut report = CapabilityReport::default();

    match api.list_projects().await {
        Ok(projects) => {
            info!(
                "Permission check passed ({} projects visible)",
                projects.len()
            );
            report.capabilities.can_list_projects = true;
        }
        Err(e) => {
            warn!("Permission check failed: {}", e);
            report
                .reasons
                .push(format!("cannot list Pages projects: {}", e));
        }
    }

    report.valid = report.capabilities.can_list_projects;
    report
}
