//! Step actions
//!
//! Actions are the opaque units of work behind steps. The runner only sees
//! success (with optional output lines) or a failure reason.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::process::Command as TokioCommand;

use super::context::ExecutionContext;
use crate::common::{Error, Result};
use crate::suite::Scenario;

/// Lines produced by a successful action
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActionOutput {
    pub lines: Vec<String>,
}

impl ActionOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
        }
    }
}

/// An executable step action
#[async_trait]
pub trait Action: Send + Sync {
    /// Perform the action with already-resolved arguments
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput>;
}

/// Adapter turning a synchronous closure into an action
pub struct FnAction<F>(pub F);

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(&[String], &mut ExecutionContext) -> Result<ActionOutput> + Send + Sync,
{
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        (self.0)(args, ctx)
    }
}

/// Actions available to steps, by name
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}

impl ActionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in actions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("am_in_path", AmInPath);
        registry.register("see_file", SeeFile);
        registry.register("dont_see_file", DontSeeFile);
        registry.register("see_in_file", SeeInFile);
        registry.register("say", Say);
        registry.register("run", Run);
        registry.register("wait", Wait);
        registry.register("fail", Fail);
        registry.register("flaky", Flaky::default());
        registry
    }

    pub fn register<A: Action + 'static>(&mut self, name: &str, action: A) {
        self.actions.insert(name.to_string(), Arc::new(action));
    }

    /// Register a synchronous closure as an action
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[String], &mut ExecutionContext) -> Result<ActionOutput> + Send + Sync + 'static,
    {
        self.register(name, FnAction(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Check that every step of every scenario names a registered action
    pub fn verify<'a, I>(&self, scenarios: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Scenario>,
    {
        for scenario in scenarios {
            if let Some(step) = scenario.steps.iter().find(|s| !self.contains(&s.action)) {
                return Err(Error::UnknownAction {
                    action: step.action.clone(),
                    scenario: scenario.display_name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::step_failed(format!("missing argument: {}", what)))
}

/// `am_in_path <dir>`: change the context working directory
pub struct AmInPath;

#[async_trait]
impl Action for AmInPath {
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let dir = ctx.resolve_path(required(args, 0, "directory")?);
        if !dir.is_dir() {
            return Err(Error::step_failed(format!(
                "directory '{}' does not exist",
                dir.display()
            )));
        }
        ctx.working_dir = dir;
        Ok(ActionOutput::none())
    }
}

/// `see_file <name>`: file exists in the working directory
pub struct SeeFile;

#[async_trait]
impl Action for SeeFile {
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let name = required(args, 0, "file name")?;
        if ctx.resolve_path(name).exists() {
            Ok(ActionOutput::none())
        } else {
            Err(Error::step_failed(format!(
                "file '{}' not found in '{}'",
                name,
                ctx.working_dir.display()
            )))
        }
    }
}

/// `dont_see_file <name>`: file is absent from the working directory
pub struct DontSeeFile;

#[async_trait]
impl Action for DontSeeFile {
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let name = required(args, 0, "file name")?;
        if ctx.resolve_path(name).exists() {
            Err(Error::step_failed(format!(
                "file '{}' was not expected in '{}'",
                name,
                ctx.working_dir.display()
            )))
        } else {
            Ok(ActionOutput::none())
        }
    }
}

/// `see_in_file <name> <text>`: file contents contain text
pub struct SeeInFile;

#[async_trait]
impl Action for SeeInFile {
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let name = required(args, 0, "file name")?;
        let expected = required(args, 1, "text")?;
        let path = ctx.resolve_path(name);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::step_failed(format!("cannot read '{}': {}", name, e)))?;
        if content.contains(expected) {
            Ok(ActionOutput::none())
        } else {
            Err(Error::step_failed(format!(
                "file '{}' does not contain '{}'",
                name, expected
            )))
        }
    }
}

/// `say <text...>`: print text, always succeeds
pub struct Say;

#[async_trait]
impl Action for Say {
    async fn perform(&self, args: &[String], _ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        Ok(ActionOutput::line(args.join(" ")))
    }
}

/// `run <command>`: run a shell command in the working directory
pub struct Run;

#[async_trait]
impl Action for Run {
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let command = args.join(" ");
        if command.trim().is_empty() {
            return Err(Error::step_failed("missing argument: command"));
        }

        let output = TokioCommand::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&ctx.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::step_failed(format!("command failed to execute: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::step_failed(format!(
                "command '{}' failed with exit code {:?}: {}",
                command,
                output.status.code(),
                stderr.trim()
            )));
        }

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        Ok(ActionOutput { lines })
    }
}

/// `wait <ms>`: sleep
pub struct Wait;

#[async_trait]
impl Action for Wait {
    async fn perform(&self, args: &[String], _ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let millis: u64 = required(args, 0, "milliseconds")?
            .parse()
            .map_err(|_| Error::step_failed(format!("invalid milliseconds: {}", args[0])))?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(ActionOutput::none())
    }
}

/// `fail <reason>`: always fails
pub struct Fail;

#[async_trait]
impl Action for Fail {
    async fn perform(&self, args: &[String], _ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let reason = if args.is_empty() {
            "failed on purpose".to_string()
        } else {
            args.join(" ")
        };
        Err(Error::step_failed(reason))
    }
}

/// `flaky <failures>`: fails the first N times per scenario step, then passes
///
/// The count survives scenario retries, so a scenario-scoped policy sees
/// the same step fail and eventually recover.
#[derive(Default)]
pub struct Flaky {
    calls: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl Action for Flaky {
    async fn perform(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<ActionOutput> {
        let failures: u32 = required(args, 0, "failure count")?
            .parse()
            .map_err(|_| Error::step_failed(format!("invalid failure count: {}", args[0])))?;

        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| Error::step_failed("flaky call counter poisoned"))?;
            let count = calls.entry(ctx.unit_key()).or_insert(0);
            *count += 1;
            *count
        };

        if call <= failures {
            Err(Error::step_failed(format!(
                "flaky failure {} of {}",
                call, failures
            )))
        } else {
            Ok(ActionOutput::none())
        }
    }
}
