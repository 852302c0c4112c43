mod config;
mod schedule;
mod signal;

use std::sync::Arc;
use sweeper_config::constants;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let sweeper_config = config::load_sweeper_config().await?;
    let client = config::create_cloudflare_client()?;
    let orchestrator = config::create_orchestrator(client, &sweeper_config);

    tracing::info!(
        "Retention policy: keep {} successful deployments per project (dry run: {})",
        sweeper_config.keep_count,
        sweeper_config.dry_run
    );

    let state = Arc::new(sweeper_api::AppState::new(orchestrator, sweeper_config));

    let api_host = std::env::var("API_HOST").unwrap_or_else(|_| constants::DEFAULT_API_HOST.into());
    let api_port = std::env::var("API_PORT").unwrap_or_else(|_| constants::DEFAULT_API_PORT.into());
    let api_addr = format!("{api_host}:{api_port}");

    let api_router = sweeper_api::router(state.clone());

    // Spawn scheduled cleanup job
    let cleanup_handle = tokio::spawn(schedule::run_cleanup_job(state.clone()));

    tracing::info!("Starting API server on {api_addr}");
    let listener = TcpListener::bind(&api_addr).await?;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, api_router)
            .with_graceful_shutdown(signal::shutdown_signal())
            .await
        {
            tracing::error!("API server failed: {}", e);
        }
    });

    let _ = server_handle.await;

    // Abandoning an in-flight run only skips deletions not yet issued
    cleanup_handle.abort();
    let _ = cleanup_handle.await;

    tracing::info!("Sweeper shutdown complete");

    Ok(())
}
