use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait PagesApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Returns the deployment list exactly as the platform sent it. The shape
    /// varies (bare array or wrapped in an object), see `normalize_deployments`.
    async fn list_deployments(&self, project_name: &str) -> Result<serde_json::Value>;

    async fn delete_deployment(&self, project_name: &str, deployment_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,

    #[serde(default)]
    pub subdomain: Option<String>,

    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subdomain: None,
            metadata: serde_json::Map::new(),
        }
    }
}
