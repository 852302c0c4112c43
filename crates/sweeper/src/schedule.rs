use std::sync::Arc;
use sweeper_api::{ApiError, AppState, Trigger};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub async fn run_cleanup_job(state: Arc<AppState>) {
    let config = state.config().clone();

    info!(
        "Starting scheduled cleanup job (every {}s, keep {}, dry run: {})",
        config.interval_secs, config.keep_count, config.dry_run
    );

    let mut interval = tokio::time::interval(config.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately
    interval.tick().await;
    if !config.run_on_startup {
        interval.tick().await;
    }

    loop {
        match state.run_cleanup(Trigger::Scheduled).await {
            Ok(summary) if summary.has_errors() => {
                warn!(
                    "Scheduled cleanup deleted {} deployment(s) with {} error(s)",
                    summary.total_deleted,
                    summary.pages.errors.len()
                );
            }
            Ok(summary) => {
                info!(
                    "Scheduled cleanup deleted {} deployment(s)",
                    summary.total_deleted
                );
            }
            Err(ApiError::RunInProgress) => {}
            Err(e) => {
                error!("Scheduled cleanup failed: {}", e);
            }
        }

        interval.tick().await;
    }
}
