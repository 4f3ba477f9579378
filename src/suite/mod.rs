//! Suite loading, expansion and filtering
//!
//! Reads a YAML suite file, normalizes retry declarations and data set
//! references, and turns the templates into an ordered run plan.

pub mod dataset;
pub mod definition;
pub mod filter;
pub mod model;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::common::config::Config;
use crate::common::{Error, Result};

pub use dataset::{expand, render_record, DataSet, Expansion};
pub use filter::Filter;
pub use model::{DataBinding, Feature, RetryPolicy, RetryScope, Scenario, Step};

use definition::{
    DataDeclaration, FeatureDefinition, RetryAttribute, ScenarioDefinition, StepDefinition,
    StepEntry, SuiteDefinition,
};

/// Defaults applied while normalizing a suite
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Scenario-scoped maxRetries when nothing is declared
    pub scenario_retries: u32,
    /// Step-scoped maxRetries when nothing is declared
    pub step_retries: u32,
    /// Step action timeout when the step declares none
    pub step_timeout: Option<Duration>,
}

impl From<&Config> for LoadOptions {
    fn from(config: &Config) -> Self {
        Self {
            scenario_retries: config.retry.scenario,
            step_retries: config.retry.step,
            step_timeout: (config.timeouts.step_ms > 0)
                .then(|| Duration::from_millis(config.timeouts.step_ms)),
        }
    }
}

/// A loaded suite of features
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub features: Vec<Feature>,
}

/// Scenarios selected for execution, in declared order
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub suite: String,
    pub scenarios: Vec<Scenario>,
}

impl RunPlan {
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Suite {
    /// Load a suite from a YAML file
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let fallback_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Suite".to_string());

        let definition: SuiteDefinition =
            serde_yaml::from_str(&content).map_err(|e| Error::load(path.display(), e))?;
        Self::from_definition(definition, base_dir, &fallback_name, options)
    }

    /// Parse a suite from YAML text
    pub fn from_yaml(content: &str, base_dir: &Path, options: &LoadOptions) -> Result<Self> {
        let definition: SuiteDefinition =
            serde_yaml::from_str(content).map_err(|e| Error::load("<inline>", e))?;
        Self::from_definition(definition, base_dir, "Suite", options)
    }

    fn from_definition(
        definition: SuiteDefinition,
        base_dir: &Path,
        fallback_name: &str,
        options: &LoadOptions,
    ) -> Result<Self> {
        let mut datasets: HashMap<String, Arc<DataSet>> = HashMap::new();
        for (name, value) in definition.datasets {
            let set = DataSet::from_value(&name, value)?;
            datasets.insert(name, Arc::new(set));
        }
        for (name, file) in definition.data_files {
            let path = if file.is_relative() {
                base_dir.join(&file)
            } else {
                file
            };
            let set = DataSet::from_file(&name, &path)?;
            datasets.insert(name, Arc::new(set));
        }

        let features = definition
            .features
            .into_iter()
            .map(|feature| normalize_feature(feature, &datasets, options))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: definition.name.unwrap_or_else(|| fallback_name.to_string()),
            features,
        })
    }

    /// All scenario instances after data-driven expansion, in declared order
    pub fn scenarios(&self) -> impl Iterator<Item = Scenario> + '_ {
        self.features
            .iter()
            .flat_map(|feature| feature.scenarios.iter())
            .flat_map(expand)
    }

    /// Expand and filter into a run plan
    pub fn plan(&self, filter: Option<&Filter>) -> RunPlan {
        let scenarios = match filter {
            Some(filter) => filter.apply(self.scenarios()),
            None => self.scenarios().collect(),
        };
        RunPlan {
            suite: self.name.clone(),
            scenarios,
        }
    }
}

/// Scenario- and step-scoped defaults split out of one declaration
#[derive(Debug, Clone, Copy, Default)]
struct ScopedRetry {
    scenario: Option<RetryPolicy>,
    step: Option<RetryPolicy>,
}

impl ScopedRetry {
    fn from_policy(policy: RetryPolicy) -> Self {
        match policy.scope {
            RetryScope::Scenario => Self {
                scenario: Some(policy),
                step: None,
            },
            RetryScope::Step => Self {
                scenario: None,
                step: Some(policy),
            },
        }
    }

    fn from_decorator(attribute: Option<&RetryAttribute>) -> Self {
        attribute
            .map(|a| Self::from_policy(RetryPolicy::from_decorator(a, RetryScope::Scenario)))
            .unwrap_or_default()
    }

    fn or(self, fallback: Self) -> Self {
        Self {
            scenario: self.scenario.or(fallback.scenario),
            step: self.step.or(fallback.step),
        }
    }
}

fn normalize_feature(
    feature: FeatureDefinition,
    datasets: &HashMap<String, Arc<DataSet>>,
    options: &LoadOptions,
) -> Result<Feature> {
    let feature_retry = ScopedRetry::from_decorator(feature.retry.as_ref());
    let scenarios = feature
        .scenarios
        .into_iter()
        .map(|scenario| {
            normalize_scenario(&feature.name, scenario, feature_retry, datasets, options)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Feature {
        name: feature.name,
        scenarios,
    })
}

fn normalize_scenario(
    feature: &str,
    scenario: ScenarioDefinition,
    feature_retry: ScopedRetry,
    datasets: &HashMap<String, Arc<DataSet>>,
    options: &LoadOptions,
) -> Result<Scenario> {
    let mut inline_calls = Vec::new();
    let mut step_definitions = Vec::new();
    for entry in scenario.steps {
        match entry {
            StepEntry::Retries(call) => inline_calls.push(call.retries),
            StepEntry::Step(step) => step_definitions.push(step),
        }
    }

    // Both declaration styles collapse into the same policy value
    let declared = match (scenario.retry.as_ref(), inline_calls.as_slice()) {
        (Some(_), [_, ..]) | (None, [_, _, ..]) => {
            return Err(Error::ConflictingRetry {
                scenario: scenario.title,
            })
        }
        (Some(attribute), []) => ScopedRetry::from_decorator(Some(attribute)),
        (None, [retries]) => ScopedRetry::from_policy(RetryPolicy::from_inline_call(*retries)),
        (None, []) => ScopedRetry::default(),
    };
    let retry = declared.or(feature_retry);

    let scenario_policy = retry.scenario.unwrap_or(RetryPolicy::new(
        options.scenario_retries,
        RetryScope::Scenario,
    ));
    let step_default = retry
        .step
        .unwrap_or(RetryPolicy::new(options.step_retries, RetryScope::Step));

    let steps = step_definitions
        .into_iter()
        .map(|step| normalize_step(&scenario.title, step, step_default, options))
        .collect::<Result<Vec<_>>>()?;

    let data = match scenario.data {
        None => DataBinding::None,
        Some(DataDeclaration::Named(name)) => match datasets.get(&name) {
            Some(set) => DataBinding::Template(Arc::clone(set)),
            None => {
                return Err(Error::dataset(
                    &scenario.title,
                    format!("unknown data set '{}'", name),
                ))
            }
        },
        Some(DataDeclaration::Inline(value)) => DataBinding::Template(Arc::new(
            DataSet::from_value(&scenario.title, value)?,
        )),
    };

    Ok(Scenario {
        feature: feature.to_string(),
        display_name: scenario.title.clone(),
        title: scenario.title,
        steps,
        data,
        retry: scenario_policy,
    })
}

fn normalize_step(
    scenario: &str,
    step: StepDefinition,
    default_retry: RetryPolicy,
    options: &LoadOptions,
) -> Result<Step> {
    let retry = match step.retry.as_ref() {
        Some(attribute) => {
            let policy = RetryPolicy::from_decorator(attribute, RetryScope::Step);
            if policy.scope != RetryScope::Step {
                return Err(Error::InvalidStep {
                    scenario: scenario.to_string(),
                    message: format!("step '{}' declares a scenario-scoped retry", step.action),
                });
            }
            policy
        }
        None => default_retry,
    };

    let args = step
        .args
        .iter()
        .map(|arg| match arg {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    Ok(Step {
        action: step.action,
        args,
        retry,
        // 0 disables the timeout, as it does in the config
        timeout: step
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .or(options.step_timeout),
    })
}
