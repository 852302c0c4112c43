pub mod config;
pub mod constants;

pub use config::{SweeperConfig, load_config, parse_keep_count};
