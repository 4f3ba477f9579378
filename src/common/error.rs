//! Error types for the scenario engine
//!
//! Errors fall in two classes. Load, filter and configuration errors are
//! fatal and abort the run before any event is emitted. Step failures are
//! reasons: the runner folds them into an `Outcome` and never lets them
//! escape the suite.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    // === Load Errors ===
    #[error("Failed to load suite '{path}': {message}")]
    Load { path: String, message: String },

    #[error("Malformed data set for scenario '{scenario}': {message}")]
    DataSet { scenario: String, message: String },

    #[error("Scenario '{scenario}' declares retries both as an attribute and inline. Keep one of them")]
    ConflictingRetry { scenario: String },

    #[error("Invalid step in scenario '{scenario}': {message}")]
    InvalidStep { scenario: String, message: String },

    #[error("Unknown action '{action}' in scenario '{scenario}'")]
    UnknownAction { action: String, scenario: String },

    // === Filter Errors ===
    #[error("Invalid grep pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    // === Step Failures ===
    #[error("{0}")]
    StepFailed(String),

    #[error("Action '{label}' timed out after {millis}ms")]
    ActionTimeout { label: String, millis: u64 },

    #[error("Unresolved template variable '{{{{{variable}}}}}'")]
    UnresolvedTemplate { variable: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a suite load error
    pub fn load(path: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Load {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a malformed data set error
    pub fn dataset(scenario: &str, message: impl std::fmt::Display) -> Self {
        Self::DataSet {
            scenario: scenario.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a step failure from any reason
    pub fn step_failed(reason: impl std::fmt::Display) -> Self {
        Self::StepFailed(reason.to_string())
    }

    /// Whether this error aborts the whole run
    ///
    /// Step failures are recovered into outcomes; everything else stops
    /// the run before execution starts.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::StepFailed(_) | Error::ActionTimeout { .. } | Error::UnresolvedTemplate { .. }
        )
    }
}
