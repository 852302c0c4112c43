use crate::constants;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    #[serde(
        default = "default_keep_count",
        deserialize_with = "deserialize_keep_count"
    )]
    pub keep_count: usize,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_max_concurrent_projects")]
    pub max_concurrent_projects: usize,

    #[serde(default)]
    pub run_on_startup: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            keep_count: default_keep_count(),
            dry_run: false,
            interval_secs: default_interval_secs(),
            max_concurrent_projects: default_max_concurrent_projects(),
            run_on_startup: false,
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Applies `KEEP_DEPLOYMENTS`, `DRY_RUN`, `CLEANUP_INTERVAL_SECS`,
    /// `MAX_CONCURRENT_PROJECTS` and `RUN_ON_STARTUP` on top of the file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("KEEP_DEPLOYMENTS") {
            self.keep_count = parse_keep_count(Some(&raw));
        }

        if let Some(raw) = lookup("DRY_RUN") {
            self.dry_run = parse_flag(&raw);
        }

        if let Some(raw) = lookup("CLEANUP_INTERVAL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.interval_secs = secs,
                _ => warn!(
                    "Ignoring invalid CLEANUP_INTERVAL_SECS '{}', keeping {}",
                    raw, self.interval_secs
                ),
            }
        }

        if let Some(raw) = lookup("MAX_CONCURRENT_PROJECTS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.max_concurrent_projects = n,
                _ => warn!(
                    "Ignoring invalid MAX_CONCURRENT_PROJECTS '{}', keeping {}",
                    raw, self.max_concurrent_projects
                ),
            }
        }

        if let Some(raw) = lookup("RUN_ON_STARTUP") {
            self.run_on_startup = parse_flag(&raw);
        }
    }
}

fn default_keep_count() -> usize {
    constants::DEFAULT_KEEP_COUNT
}

fn default_interval_secs() -> u64 {
    constants::DEFAULT_CLEANUP_INTERVAL_SECS
}

fn default_max_concurrent_projects() -> usize {
    constants::DEFAULT_MAX_CONCURRENT_PROJECTS
}

fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    raw == "true" || raw == "1"
}

/// Parses a keep-count, falling back to the default when the value is
/// absent, negative or not an integer.
pub fn parse_keep_count(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return constants::DEFAULT_KEEP_COUNT;
    };

    match raw.trim().parse::<usize>() {
        Ok(count) => count,
        Err(_) => {
            warn!(
                "Invalid keep count '{}', falling back to {}",
                raw,
                constants::DEFAULT_KEEP_COUNT
            );
            constants::DEFAULT_KEEP_COUNT
        }
    }
}

fn deserialize_keep_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;

    Ok(match value {
        toml::Value::Integer(n) if n >= 0 => n as usize,
        toml::Value::String(s) => parse_keep_count(Some(&s)),
        other => {
            warn!(
                "Invalid keep_count {:?}, falling back to {}",
                other,
                constants::DEFAULT_KEEP_COUNT
            );
            constants::DEFAULT_KEEP_COUNT
        }
    })
}

/// Reads the TOML config file, returning defaults when it does not exist.
pub async fn load_config(path: &Path) -> std::io::Result<SweeperConfig> {
    if !path.exists() {
        return Ok(SweeperConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: SweeperConfig = toml::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(config)
}
