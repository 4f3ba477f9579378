//! Run configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::discover_config;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Path to the YAML suite definition
    pub suite: PathBuf,

    /// Initial working directory for every scenario
    pub working_dir: PathBuf,

    /// Default grep pattern
    pub grep: Option<String>,

    /// Keep scenarios that do NOT match the grep pattern
    pub invert_grep: bool,

    /// Retry defaults
    pub retry: RetryDefaults,

    /// Timeout settings
    pub timeouts: Timeouts,

    /// Data set handling
    pub data: DataConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Directory the configuration was loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            suite: default_suite(),
            working_dir: PathBuf::from("."),
            grep: None,
            invert_grep: false,
            retry: RetryDefaults::default(),
            timeouts: Timeouts::default(),
            data: DataConfig::default(),
            output: OutputConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

fn default_suite() -> PathBuf {
    PathBuf::from("suite.yaml")
}

/// Default retry counts applied when a scenario or step declares none
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryDefaults {
    /// Scenario-scoped maxRetries
    pub scenario: u32,

    /// Step-scoped maxRetries
    pub step: u32,

    /// Pause between attempts
    pub delay_ms: u64,
}

/// Timeout settings in milliseconds
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    /// Per-step action timeout, 0 disables it
    pub step_ms: u64,
}

/// What a scenario-level retry does with its bound record
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RebindMode {
    /// Keep the record bound at expansion time
    #[default]
    Reuse,
    /// Re-run the data expander and bind the fresh record at the same position
    Reexpand,
}

/// Data set configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub on_retry: RebindMode,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Surface every event record
    pub verbose: bool,
}

impl Config {
    /// Load configuration from an explicit path or the discovered default
    ///
    /// Returns default configuration if no file is found
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match discover_config() {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let mut config: Config =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Deep-merge a JSON object over this configuration
    pub fn apply_override(self, json: &str) -> Result<Self> {
        let patch: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid --override JSON: {}", e)))?;
        if !patch.is_object() {
            return Err(Error::Config(
                "--override must be a JSON object".to_string(),
            ));
        }

        let base_dir = self.base_dir.clone();
        let mut value = serde_json::to_value(&self)?;
        merge(&mut value, patch);

        let mut merged: Config = serde_json::from_value(value)
            .map_err(|e| Error::Config(format!("Invalid --override value: {}", e)))?;
        merged.base_dir = base_dir;
        Ok(merged)
    }

    /// Path to the suite file, resolved against the config directory
    pub fn suite_path(&self) -> PathBuf {
        self.resolve(&self.suite)
    }

    /// Initial working directory, resolved against the config directory
    pub fn working_dir(&self) -> PathBuf {
        self.resolve(&self.working_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

fn merge(target: &mut serde_json::Value, patch: serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}
