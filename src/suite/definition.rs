//! Suite file configuration types
//!
//! Defines the data structures for deserializing YAML suite files. These
//! types mirror the file layout; `suite::model` holds the normalized form
//! the runners execute.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::model::RetryScope;

/// A complete suite loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct SuiteDefinition {
    /// Name of the suite (defaults to the file stem)
    pub name: Option<String>,
    /// Named inline data sets
    #[serde(default)]
    pub datasets: HashMap<String, serde_json::Value>,
    /// Named data sets loaded from JSON or YAML files
    #[serde(default)]
    pub data_files: HashMap<String, PathBuf>,
    /// Features in declaration order
    pub features: Vec<FeatureDefinition>,
}

/// A named group of scenarios
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct FeatureDefinition {
    pub name: String,
    /// Default retry declaration for every scenario of the feature
    pub retry: Option<RetryAttribute>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioDefinition>,
}

/// A scenario template
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    pub title: String,
    /// Decorator-style retry declaration
    pub retry: Option<RetryAttribute>,
    /// Bound data set: a name from `datasets`/`data_files`, or inline records
    pub data: Option<DataDeclaration>,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

/// Decorator-style retry declaration: `retry: 2` or `retry: { max_retries: 2, scope: step }`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RetryAttribute {
    Count(u32),
    Detailed {
        max_retries: u32,
        scope: Option<RetryScope>,
    },
}

/// Data set reference attached to a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum DataDeclaration {
    /// Reference to a named data set
    Named(String),
    /// Records declared in place
    Inline(serde_json::Value),
}

/// One entry of a scenario's step list
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum StepEntry {
    /// Legacy inline-call retry declaration: `- retries: 4`
    Retries(InlineRetries),
    /// An action invocation
    Step(StepDefinition),
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct InlineRetries {
    pub retries: u32,
}

/// A single step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct StepDefinition {
    /// Registered action name (e.g., "say", "see_file")
    pub action: String,
    /// Literal or templated arguments
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    /// Step-scoped retry declaration
    pub retry: Option<RetryAttribute>,
    /// Action timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_entries() {
        let yaml = r#"
title: Old style flaky
steps:
  - retries: 4
  - action: say
    args: ["hello", 42]
    retry: { max_retries: 2, scope: step }
  - action: see_file
    args: [stepwise.toml]
    timeout_ms: 100
"#;
        let scenario: ScenarioDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(
            scenario.steps[0],
            StepEntry::Retries(InlineRetries { retries: 4 })
        ));
        match &scenario.steps[1] {
            StepEntry::Step(step) => {
                assert_eq!(step.action, "say");
                assert_eq!(step.args.len(), 2);
                assert_eq!(
                    step.retry,
                    Some(RetryAttribute::Detailed {
                        max_retries: 2,
                        scope: Some(RetryScope::Step)
                    })
                );
            }
            other => panic!("Expected step, got {:?}", other),
        }
        match &scenario.steps[2] {
            StepEntry::Step(step) => assert_eq!(step.timeout_ms, Some(100)),
            other => panic!("Expected step, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_data_declarations() {
        let named: ScenarioDefinition =
            serde_yaml::from_str("title: a\ndata: accounts\n").unwrap();
        assert!(matches!(named.data, Some(DataDeclaration::Named(ref n)) if n == "accounts"));

        let inline: ScenarioDefinition =
            serde_yaml::from_str("title: a\ndata: [nick, jack]\n").unwrap();
        assert!(matches!(inline.data, Some(DataDeclaration::Inline(ref v)) if v.is_array()));
    }
}
