//! stepwise - a scenario runner with data-driven scenarios and bounded retries
//!
//! This library loads suites of features and scenarios, multiplies scenarios
//! over data sets, filters them by name, and executes them step by step with
//! scenario- and step-scoped retry policies.

pub mod cli;
pub mod commands;
pub mod common;
pub mod events;
pub mod runner;
pub mod suite;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use events::{EventBus, EventKind, EventRecord};
pub use runner::{ActionRegistry, Outcome, RunSettings, SuiteReport, SuiteRunner};
pub use suite::{Filter, LoadOptions, RunPlan, Suite};
