//! stepwise - a scenario runner with data-driven scenarios and bounded retries
//!
//! Loads a YAML suite, expands and filters its scenarios, and runs them one
//! at a time while reporting every lifecycle event.

use clap::Parser;
use commands::Commands;
use stepwise::common::logging;
use stepwise::{cli, commands};

#[derive(Parser)]
#[command(name = "stepwise", about = "Scenario runner with retries and data-driven tests")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
