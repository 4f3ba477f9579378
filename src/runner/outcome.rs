//! Unit outcomes

use serde::Serialize;

/// Result of running a step, a scenario attempt or a whole scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
    /// An attempt that failed and was followed by retry number `attempt`
    Retried { attempt: u32, reason: String },
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// Failure reason, if the outcome carries one
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed { reason } | Outcome::Retried { reason, .. } => Some(reason),
        }
    }
}
