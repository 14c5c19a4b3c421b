pub mod config;
pub mod decide;
pub mod plot;

use ecogate_core::{Config, Threshold};
use std::path::PathBuf;

/// Command-line values that take precedence over the config file.
pub struct Overrides {
    pub threshold: Option<Threshold>,
    pub interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub log_path: Option<PathBuf>,
    pub json: bool,
}

impl Overrides {
    pub fn threshold(&self, config: &Config) -> Threshold {
        self.threshold.unwrap_or_else(|| config.threshold())
    }

    pub fn log_path(&self, config: &Config) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| config.log_path.clone())
    }
}
