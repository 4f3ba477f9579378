//! Scenario execution engine
//!
//! Suite runner → scenario runner → step executor, with a retrier wrapped
//! around scenarios and around each step.

pub mod actions;
pub mod context;
pub mod outcome;
pub mod retry;
pub mod scenario;
pub mod step;
pub mod suite;
mod template;

pub use actions::{Action, ActionOutput, ActionRegistry};
pub use context::ExecutionContext;
pub use outcome::Outcome;
pub use retry::{Attempt, Retrier, RetryNotice, RetryRun};
pub use scenario::{RunSettings, ScenarioReport, ScenarioRunner};
pub use step::StepExecutor;
pub use suite::{SuiteReport, SuiteRunner};
