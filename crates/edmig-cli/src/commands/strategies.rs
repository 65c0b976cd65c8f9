//! Strategies command
//!
//! Usage: edmig strategies [--json]

use clap::Args;
use edmig_core::naming::{available_strategies, LEGACY, NESTED};

#[derive(Debug, Args)]
pub struct StrategiesArgs {
    /// Print the descriptors as JSON
    #[arg(long)]
    pub json: bool,
}

fn describe(id: &str) -> &'static str {
    match id {
        LEGACY => "name followed by each block name and index (contentmain2)",
        NESTED => "block path before the name (main:2.content)",
        _ => "",
    }
}

/// Execute strategies command
pub fn execute(args: StrategiesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let strategies = available_strategies();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&strategies)?);
        return Ok(());
    }

    for strategy in &strategies {
        println!("{:<8} {}", strategy.id, describe(&strategy.id));
    }
    Ok(())
}
