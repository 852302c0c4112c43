use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use sweeper_config::{SweeperConfig, constants};
use sweeper_pages::{CleanupOrchestrator, CloudflareClient, RetentionPolicy, select_credentials};

pub async fn load_sweeper_config() -> anyhow::Result<SweeperConfig> {
    let path = std::env::var("SWEEPER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(constants::DEFAULT_CONFIG_PATH));

    let mut config = sweeper_config::load_config(&path)
        .await
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    config.apply_env(|key| std::env::var(key).ok());

    Ok(config)
}

pub fn create_cloudflare_client() -> anyhow::Result<CloudflareClient> {
    let account_id =
        std::env::var("CLOUDFLARE_ACCOUNT_ID").context("CLOUDFLARE_ACCOUNT_ID must be set")?;

    let credentials = select_credentials(
        std::env::var("CLOUDFLARE_API_TOKEN").ok(),
        std::env::var("CLOUDFLARE_EMAIL").ok(),
        std::env::var("CLOUDFLARE_API_KEY").ok(),
    )?;

    let client = match std::env::var("CLOUDFLARE_API_BASE") {
        Ok(base_url) => CloudflareClient::with_base_url(&base_url, account_id, credentials)?,
        Err(_) => CloudflareClient::new(account_id, credentials)?,
    };

    Ok(client)
}

pub fn create_orchestrator(
    client: CloudflareClient,
    config: &SweeperConfig,
) -> Arc<CleanupOrchestrator> {
    let policy = RetentionPolicy {
        keep_count: config.keep_count,
        dry_run: config.dry_run,
    };

    Arc::new(CleanupOrchestrator::new(
        Arc::new(client),
        policy,
        config.max_concurrent_projects,
    ))
}
