//! edmig CLI
//!
//! Command-line interface for editable naming migrations

use clap::{Parser, Subcommand};
use edmig_core::logging_facility::{init, Profile};

mod commands;
mod config;

/// Exit status for invalid invocations and input errors
const EXIT_INPUT_ERROR: i32 = 6;

#[derive(Debug, Parser)]
#[command(name = "edmig")]
#[command(about = "edmig - Migrate stored editable names between naming strategies", long_about = None)]
struct Cli {
    /// Human-readable debug logs on stderr
    #[arg(short, long, global = true, conflicts_with = "log_json")]
    verbose: bool,

    /// JSON logs on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rename stored editables to follow a new naming strategy
    Migrate(commands::migrate::MigrateArgs),
    /// List the available naming strategies
    Strategies(commands::strategies::StrategiesArgs),
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_INPUT_ERROR } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if cli.verbose {
        init(Profile::Development);
    } else if cli.log_json {
        init(Profile::Production);
    }

    let result = match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(args),
        Commands::Strategies(args) => commands::strategies::execute(args).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_INPUT_ERROR);
        }
    }
}
