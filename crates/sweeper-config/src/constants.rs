use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: &str = "3000";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sweeper/sweeper.toml";

pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_PROJECT_PAGES: u32 = 20;
pub const MAX_DEPLOYMENT_PAGES: u32 = 50;

pub const DEFAULT_KEEP_COUNT: usize = 5;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 86400;
pub const DEFAULT_MAX_CONCURRENT_PROJECTS: usize = 4;

