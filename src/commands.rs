//! CLI command definitions
//!
//! Defines the clap commands for the stepwise CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Options shared by commands that select scenarios
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Configuration file (default: ./stepwise.toml, then the user config)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Only scenarios whose name contains this text; `/expr/` or `/expr/i` for a regex
    #[arg(long, short)]
    pub grep: Option<String>,

    /// Select scenarios that do NOT match the grep pattern
    #[arg(long, short)]
    pub invert: bool,

    /// JSON object merged over the configuration file
    #[arg(long = "override", short)]
    pub override_config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the suite
    Run {
        #[command(flatten)]
        select: SelectArgs,

        /// Print every lifecycle event and step label
        #[arg(long, short)]
        verbose: bool,

        /// Print the suite report as JSON instead of console output
        #[arg(long)]
        json: bool,
    },

    /// List the scenarios a run would execute, without running them
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        select: SelectArgs,
    },
}

impl Commands {
    /// Verbose flag, used to pick the log level before dispatch
    pub fn verbose(&self) -> bool {
        match self {
            Commands::Run { verbose, .. } => *verbose,
            Commands::List { .. } => false,
        }
    }
}
