//! Lifecycle event records

use serde::Serialize;
use std::fmt;

/// Fixed set of lifecycle event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    #[serde(rename = "suite.before")]
    SuiteBefore,
    #[serde(rename = "suite.after")]
    SuiteAfter,
    #[serde(rename = "scenario.before")]
    ScenarioBefore,
    #[serde(rename = "scenario.after")]
    ScenarioAfter,
    #[serde(rename = "step.before")]
    StepBefore,
    #[serde(rename = "step.start")]
    StepStart,
    #[serde(rename = "step.after")]
    StepAfter,
    #[serde(rename = "step.failed")]
    StepFailed,
    #[serde(rename = "step.retry")]
    StepRetry,
    #[serde(rename = "scenario.failed")]
    ScenarioFailed,
    #[serde(rename = "scenario.retry")]
    ScenarioRetry,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::SuiteBefore,
        EventKind::SuiteAfter,
        EventKind::ScenarioBefore,
        EventKind::ScenarioAfter,
        EventKind::StepBefore,
        EventKind::StepStart,
        EventKind::StepAfter,
        EventKind::StepFailed,
        EventKind::StepRetry,
        EventKind::ScenarioFailed,
        EventKind::ScenarioRetry,
    ];

    /// Wire name, e.g. `step.before`
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SuiteBefore => "suite.before",
            EventKind::SuiteAfter => "suite.after",
            EventKind::ScenarioBefore => "scenario.before",
            EventKind::ScenarioAfter => "scenario.after",
            EventKind::StepBefore => "step.before",
            EventKind::StepStart => "step.start",
            EventKind::StepAfter => "step.after",
            EventKind::StepFailed => "step.failed",
            EventKind::StepRetry => "step.retry",
            EventKind::ScenarioFailed => "scenario.failed",
            EventKind::ScenarioRetry => "scenario.retry",
        }
    }

    pub fn is_step(&self) -> bool {
        matches!(
            self,
            EventKind::StepBefore
                | EventKind::StepStart
                | EventKind::StepAfter
                | EventKind::StepFailed
                | EventKind::StepRetry
        )
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, EventKind::StepRetry | EventKind::ScenarioRetry)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the run an event was emitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Index of the step within its scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Zero-based scenario attempt
    pub attempt: u32,
    /// Zero-based attempt of the current step
    pub step_attempt: u32,
}

impl EventScope {
    /// Scope for suite-level events
    pub fn suite() -> Self {
        Self::default()
    }
}

/// One accepted event. Ordinals are assigned by the bus and strictly increase.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub ordinal: u64,
    pub kind: EventKind,
    pub payload: String,
    pub scope: EventScope,
    /// Output produced by the step's action (only on `step.start`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,
}

impl EventRecord {
    /// Verbose rendering: `Emitted | step.before (I am in path ".")`
    pub fn render(&self) -> String {
        format!("Emitted | {} ({})", self.kind, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_render() {
        let record = EventRecord {
            ordinal: 0,
            kind: EventKind::StepBefore,
            payload: "I am in path \".\"".to_string(),
            scope: EventScope::suite(),
            output: Vec::new(),
        };
        assert_eq!(record.render(), "Emitted | step.before (I am in path \".\")");
    }
}
