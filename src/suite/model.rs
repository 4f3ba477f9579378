//! Normalized suite model
//!
//! Features and scenario templates are immutable once loaded. Data-driven
//! instances are new `Scenario` values produced by the expander; the
//! template they came from is never touched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::dataset::DataSet;
use super::definition::RetryAttribute;
use crate::common::{Error, Result};

/// Which unit a retry policy re-runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// Re-run the whole scenario from its first step
    Scenario,
    /// Re-run a single step in place
    Step,
}

/// Bounded retry policy. `max_retries = 0` runs the unit once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub scope: RetryScope,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, scope: RetryScope) -> Self {
        Self { max_retries, scope }
    }

    /// Run-once policy
    pub fn once(scope: RetryScope) -> Self {
        Self::new(0, scope)
    }

    /// Normalize a decorator-style declaration (`retry: N` or `retry: {..}`)
    pub fn from_decorator(attribute: &RetryAttribute, default_scope: RetryScope) -> Self {
        match attribute {
            RetryAttribute::Count(max_retries) => Self::new(*max_retries, default_scope),
            RetryAttribute::Detailed { max_retries, scope } => {
                Self::new(*max_retries, scope.unwrap_or(default_scope))
            }
        }
    }

    /// Normalize a legacy inline-call declaration (`- retries: N` in the step list)
    pub fn from_inline_call(retries: u32) -> Self {
        Self::new(retries, RetryScope::Scenario)
    }

    /// Total number of attempts the policy allows
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// A named group of scenario templates
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

/// One atomic action with its (possibly templated) arguments
#[derive(Debug, Clone)]
pub struct Step {
    pub action: String,
    pub args: Vec<String>,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

impl Step {
    /// Human-readable label, e.g. `I am in path "."`
    pub fn label(&self, args: &[String]) -> String {
        let mut label = format!("I {}", self.action.replace('_', " "));
        if !args.is_empty() {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| serde_json::Value::String(a.clone()).to_string())
                .collect();
            label.push(' ');
            label.push_str(&rendered.join(", "));
        }
        label
    }
}

/// Data attached to a scenario
#[derive(Debug, Clone)]
pub enum DataBinding {
    /// Plain scenario
    None,
    /// Template to be multiplied by the data set
    Template(Arc<DataSet>),
    /// Instance bound to one record of a data set
    Bound {
        source: Arc<DataSet>,
        index: usize,
        record: serde_json::Value,
    },
}

/// A scenario template or a concrete, executable instance
#[derive(Debug, Clone)]
pub struct Scenario {
    pub feature: String,
    pub title: String,
    /// `<title>` or `<title> | <serialized record>` for data-driven instances
    pub display_name: String,
    pub steps: Vec<Step>,
    pub data: DataBinding,
    pub retry: RetryPolicy,
}

impl Scenario {
    /// Feature name followed by the display name
    pub fn qualified_name(&self) -> String {
        format!("{}: {}", self.feature, self.display_name)
    }

    /// Record bound to this instance, if any
    pub fn record(&self) -> Option<&serde_json::Value> {
        match &self.data {
            DataBinding::Bound { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self.data, DataBinding::Template(_))
    }

    /// Re-run the data expander for this instance and return the fresh record
    /// at the same position
    pub fn rebind(&self) -> Result<Option<serde_json::Value>> {
        match &self.data {
            DataBinding::Bound { source, index, .. } => {
                let fresh = source.reload()?;
                fresh.records().get(*index).cloned().map(Some).ok_or_else(|| {
                    Error::step_failed(format!(
                        "data set '{}' no longer has a record at position {}",
                        source.name(),
                        index
                    ))
                })
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(action: &str) -> Step {
        Step {
            action: action.to_string(),
            args: Vec::new(),
            retry: RetryPolicy::once(RetryScope::Step),
            timeout: None,
        }
    }

    #[test]
    fn test_step_label_quotes_args() {
        let s = step("am_in_path");
        assert_eq!(s.label(&[".".to_string()]), "I am in path \".\"");
        assert_eq!(
            s.label(&["a".to_string(), "b".to_string()]),
            "I am in path \"a\", \"b\""
        );
        assert_eq!(step("wait").label(&[]), "I wait");
    }

    #[test]
    fn test_step_label_uses_json_escapes() {
        let s = step("say");
        assert_eq!(s.label(&["\u{1b}[1m".to_string()]), r#"I say "\u001b[1m""#);
        assert_eq!(s.label(&["tab\there".to_string()]), r#"I say "tab\there""#);
        assert_eq!(s.label(&["café".to_string()]), "I say \"café\"");
    }

    #[test]
    fn test_retry_styles_normalize_identically() {
        let decorator = RetryPolicy::from_decorator(&RetryAttribute::Count(4), RetryScope::Scenario);
        let detailed = RetryPolicy::from_decorator(
            &RetryAttribute::Detailed {
                max_retries: 4,
                scope: None,
            },
            RetryScope::Scenario,
        );
        let inline = RetryPolicy::from_inline_call(4);

        assert_eq!(decorator, inline);
        assert_eq!(detailed, inline);
        assert_eq!(inline.attempts(), 5);
    }
}
