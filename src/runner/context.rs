//! Per-scenario execution state

use serde_json::Value;
use std::path::{Path, PathBuf};

use super::template;
use crate::common::Result;
use crate::events::EventScope;
use crate::suite::Scenario;

/// Mutable state of the scenario currently executing
///
/// Owned by the scenario runner; only one context is live at a time.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub feature: String,
    pub scenario: String,
    /// Index of the step being executed
    pub step: Option<usize>,
    /// Zero-based scenario attempt
    pub attempt: u32,
    /// Zero-based attempt of the current step
    pub step_attempt: u32,
    /// Record bound for this attempt
    pub record: Option<Value>,
    /// Directory actions resolve relative paths against
    pub working_dir: PathBuf,
}

impl ExecutionContext {
    pub fn for_scenario(scenario: &Scenario, working_dir: &Path) -> Self {
        Self {
            feature: scenario.feature.clone(),
            scenario: scenario.display_name.clone(),
            step: None,
            attempt: 0,
            step_attempt: 0,
            record: scenario.record().cloned(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Reset per-attempt state before a fresh scenario attempt
    pub fn begin_attempt(&mut self, attempt: u32, working_dir: &Path) {
        self.attempt = attempt;
        self.step = None;
        self.step_attempt = 0;
        self.working_dir = working_dir.to_path_buf();
    }

    pub fn scope(&self) -> EventScope {
        EventScope {
            feature: Some(self.feature.clone()),
            scenario: Some(self.scenario.clone()),
            step: self.step,
            attempt: self.attempt,
            step_attempt: self.step_attempt,
        }
    }

    /// Resolve templated step arguments against the bound record
    pub fn render_args(&self, args: &[String]) -> Result<Vec<String>> {
        args.iter()
            .map(|arg| template::render(arg, self.record.as_ref()))
            .collect()
    }

    /// Resolve a path against the working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_relative() {
            self.working_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Key identifying the current step across scenario attempts
    pub fn unit_key(&self) -> String {
        match self.step {
            Some(step) => format!("{}::{}::{}", self.feature, self.scenario, step),
            None => format!("{}::{}", self.feature, self.scenario),
        }
    }
}
