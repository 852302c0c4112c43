use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use sweeper_api::{AppState, RunResult, Trigger};
use sweeper_config::SweeperConfig;
use sweeper_pages::{
    CleanupOrchestrator, PagesApi, Project, Result, RetentionPolicy, TransportError,
};
use tokio::sync::Notify;
use tower::ServiceExt;

struct StaticPagesApi {
    authorized: bool,
    deployments: Value,
    delete_calls: AtomicUsize,
}

impl StaticPagesApi {
    fn new(authorized: bool) -> Self {
        Self {
            authorized,
            deployments: json!({
                "result": [
                    { "id": "new", "created_on": "2024-01-02T00:00:00Z", "latest_stage": { "status": "success" } },
                    { "id": "old", "created_on": "2024-01-01T00:00:00Z", "latest_stage": { "status": "success" } },
                ]
            }),
            delete_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PagesApi for StaticPagesApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        if !self.authorized {
            return Err(TransportError::new("GET /pages/projects", "Authentication error")
                .with_status(403)
                .into());
        }
        Ok(vec![Project::new("docs")])
    }

    async fn list_deployments(&self, _project_name: &str) -> Result<Value> {
        Ok(self.deployments.clone())
    }

    async fn delete_deployment(&self, _project_name: &str, _deployment_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Holds every deployment listing open until `release` is notified.
#[derive(Default)]
struct GatedPagesApi {
    listing_started: Notify,
    release: Notify,
}

#[async_trait]
impl PagesApi for GatedPagesApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(vec![Project::new("docs")])
    }

    async fn list_deployments(&self, _project_name: &str) -> Result<Value> {
        self.listing_started.notify_one();
        self.release.notified().await;
        Ok(json!([]))
    }

    async fn delete_deployment(&self, _project_name: &str, _deployment_id: &str) -> Result<()> {
        Ok(())
    }
}

fn app_state(api: Arc<dyn PagesApi>) -> Arc<AppState> {
    let config = SweeperConfig {
        keep_count: 1,
        ..Default::default()
    };
    let policy = RetentionPolicy {
        keep_count: config.keep_count,
        dry_run: config.dry_run,
    };
    let orchestrator = Arc::new(CleanupOrchestrator::new(
        api,
        policy,
        config.max_concurrent_projects,
    ));
    Arc::new(AppState::new(orchestrator, config))
}

async fn send(state: Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = sweeper_api::router(state)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health() {
    let state = app_state(Arc::new(StaticPagesApi::new(true)));

    let (status, body) = send(state, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_manual_cleanup_returns_summary() {
    let api = Arc::new(StaticPagesApi::new(true));
    let state = app_state(api.clone());

    let (status, body) = send(state.clone(), "POST", "/cleanup").await;

    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["total_deleted"], 1);
    assert_eq!(summary["pages"]["projects"], 1);
    assert_eq!(api.delete_calls.load(Ordering::SeqCst), 1);

    let record = state.last_run().await.expect("run should be recorded");
    assert_eq!(record.trigger, Trigger::Manual);
    assert!(matches!(record.result, RunResult::Completed { .. }));
}

#[tokio::test]
async fn test_manual_cleanup_forbidden_without_permissions() {
    let api = Arc::new(StaticPagesApi::new(false));
    let state = app_state(api.clone());

    let (status, body) = send(state.clone(), "POST", "/cleanup").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(
        error["reasons"][0]
            .as_str()
            .unwrap()
            .contains("Authentication error")
    );
    assert_eq!(api.delete_calls.load(Ordering::SeqCst), 0);

    let record = state.last_run().await.expect("failure should be recorded");
    assert!(matches!(record.result, RunResult::Failed { .. }));
}

#[tokio::test]
async fn test_status_reports_config_permissions_and_last_run() {
    let state = app_state(Arc::new(StaticPagesApi::new(true)));
    state.run_cleanup(Trigger::Scheduled).await.unwrap();

    let (status, body) = send(state, "GET", "/status").await;

    assert_eq!(status, StatusCode::OK);
    let status: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["keep_count"], 1);
    assert_eq!(status["dry_run"], false);
    assert_eq!(status["running"], false);
    assert_eq!(status["permissions"]["valid"], true);
    assert_eq!(status["last_run"]["trigger"], "scheduled");
    assert_eq!(status["last_run"]["result"]["status"], "completed");
}

#[tokio::test]
async fn test_status_without_runs() {
    let state = app_state(Arc::new(StaticPagesApi::new(false)));

    let (status, body) = send(state, "GET", "/status").await;

    assert_eq!(status, StatusCode::OK);
    let status: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["permissions"]["valid"], false);
    assert!(status["last_run"].is_null());
}

#[tokio::test]
async fn test_overlapping_manual_cleanup_is_rejected() {
    let api = Arc::new(GatedPagesApi::default());
    let state = app_state(api.clone());

    let first = tokio::spawn(send(state.clone(), "POST", "/cleanup"));
    api.listing_started.notified().await;

    let (status, body) = send(state.clone(), "POST", "/cleanup").await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["reasons"], json!([]));

    let (status, body) = send(state.clone(), "GET", "/status").await;
    assert_eq!(status, StatusCode::OK);
    let status: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["running"], true);
    assert!(status["last_run"].is_null());

    api.release.notify_one();
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(!state.is_running());
}
