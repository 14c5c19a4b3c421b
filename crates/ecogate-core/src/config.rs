//! TOML-based application configuration.
//!
//! Stores:
//! - The green threshold and poll interval
//! - Where the decision log lives
//! - Carbon intensity source settings (endpoint, zone, normalization range)
//!
//! Configuration is stored at `~/.config/ecogate/config.toml`. The API token
//! is never written here; it is read from `ELECTRICITY_MAP_TOKEN`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::decision::{Threshold, DEFAULT_THRESHOLD};
use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://api.electricitymap.org/v3/carbon-intensity/latest";
pub const DEFAULT_ZONE: &str = "DE";
pub const DEFAULT_LOG_PATH: &str = "eco_log.txt";

/// Returns `~/.config/ecogate[-dev]/` based on ECOGATE_ENV.
///
/// Set ECOGATE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ECOGATE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("ecogate-dev")
    } else {
        base_dir.join("ecogate")
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Carbon intensity source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_zone")]
    pub zone: String,
    /// Intensity (gCO2eq/kWh) mapped to a damage index of 0.
    #[serde(default)]
    pub min_gco2: f64,
    /// Intensity (gCO2eq/kWh) mapped to a damage index of 1.
    #[serde(default = "default_max_gco2")]
    pub max_gco2: f64,
    /// Per-request timeout. Unset keeps the HTTP client's default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/ecogate/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default)]
    pub carbon: CarbonConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_zone() -> String {
    DEFAULT_ZONE.into()
}
fn default_max_gco2() -> f64 {
    800.0
}
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_check_interval_secs() -> u64 {
    60
}
fn default_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_PATH)
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            zone: default_zone(),
            min_gco2: 0.0,
            max_gco2: default_max_gco2(),
            request_timeout_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            check_interval_secs: default_check_interval_secs(),
            log_path: default_log_path(),
            carbon: CarbonConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                    // Optional fields serialize as null; accept a number or clear them.
                    serde_json::Value::Null => {
                        if value.is_empty() || value == "none" {
                            serde_json::Value::Null
                        } else {
                            parse_number(value).unwrap_or_else(|| value.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, or write and return the default if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed or
    /// holds an invalid value, or if the default config cannot be written.
    /// An existing file is never overwritten.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Threshold::new(self.threshold).map_err(|e| ConfigError::InvalidValue {
            key: "threshold".into(),
            message: e.to_string(),
        })?;
        if self.carbon.max_gco2 <= self.carbon.min_gco2 {
            return Err(ConfigError::InvalidValue {
                key: "carbon.max_gco2".into(),
                message: format!(
                    "must be greater than carbon.min_gco2 ({})",
                    self.carbon.min_gco2
                ),
            });
        }
        Ok(())
    }

    /// The validated threshold, falling back to the default if the stored
    /// value is out of range.
    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.threshold).unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}
