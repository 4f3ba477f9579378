//! CLI command handling
//!
//! Resolves configuration, loads the suite and runs or lists the plan.

mod reporter;

pub use reporter::ConsoleReporter;

use crate::commands::{Commands, SelectArgs};
use crate::common::config::Config;
use crate::common::Result;
use crate::runner::{ActionRegistry, SuiteRunner};
use crate::suite::{filter, LoadOptions, RunPlan, Suite};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            select,
            verbose,
            json,
        } => {
            let mut config = resolve_config(&select)?;
            config.output.verbose |= verbose;
            let plan = load_plan(&config, &select)?;

            let mut runner = SuiteRunner::from_config(&config, ActionRegistry::with_builtins());
            if !json {
                let mut reporter = ConsoleReporter::new(config.output.verbose);
                runner.subscribe(move |record| {
                    for line in reporter.render(record) {
                        println!("{}", line);
                    }
                });
            }

            let report = runner.run(plan).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!();
                println!("{}", ConsoleReporter::summary(&report));
            }

            Ok(report.exit_code())
        }

        Commands::List { select } => {
            let config = resolve_config(&select)?;
            let plan = load_plan(&config, &select)?;

            for line in ConsoleReporter::plan(&plan) {
                println!("{}", line);
            }

            Ok(0)
        }
    }
}

/// Configuration file plus the `--override` patch
fn resolve_config(select: &SelectArgs) -> Result<Config> {
    let config = Config::load(select.config.as_deref())?;
    match &select.override_config {
        Some(patch) => config.apply_override(patch),
        None => Ok(config),
    }
}

/// Load, expand and filter the suite; command-line grep wins over config
fn load_plan(config: &Config, select: &SelectArgs) -> Result<RunPlan> {
    let pattern = select.grep.clone().or_else(|| config.grep.clone());
    let invert = select.invert || config.invert_grep;
    let filter = filter::build(pattern.as_deref(), invert)?;
    if let Some(filter) = &filter {
        tracing::debug!(pattern = filter.pattern(), invert, "Filtering scenarios");
    }

    let suite_path = config.suite_path();
    tracing::debug!(suite = %suite_path.display(), "Loading suite");
    let suite = Suite::load(&suite_path, &LoadOptions::from(config))?;

    let plan = suite.plan(filter.as_ref());
    tracing::debug!(selected = plan.len(), "Plan ready");
    Ok(plan)
}
