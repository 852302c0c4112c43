mod cloudflare;
mod error;
mod orchestrator;
mod permissions;
mod policy;
mod provider;
mod worker;

pub use crate::cloudflare::{CloudflareClient, select_credentials};
pub use ::cloudflare::framework::auth::Credentials;
pub use error::{Error, Result, TransportError};
pub use orchestrator::{CategoryOutcome, CleanupOrchestrator, CleanupSummary};
pub use permissions::{Capabilities, CapabilityReport, check_permissions};
pub use policy::{
    DataShapeWarning, Deployment, DeploymentStage, Normalized, RetentionPlan, SUCCESS_STATUS,
    compute_delete_set, normalize_deployments, select_for_deletion,
};
pub use provider::{PagesApi, Project};
pub use worker::{RetentionOutcome, RetentionPolicy, cleanup_project};
