//! Gen command - generate scripts from a previously saved strategy.

use super::run::print_report;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::export::load_strategy;
use crate::orchestrator::{Orchestrator, RunOptions};
use anyhow::Result;
use std::path::Path;

/// Run the gen command.
pub async fn run_gen(
    strategy_file: &Path,
    scripts: Option<usize>,
    instructions: &str,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Generate) {
        Output::error(&format!("{}", e));
        Output::info("Run 'reelsmith doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let strategy = load_strategy(strategy_file)?;
    let niche = if strategy.niche.is_empty() {
        "general".to_string()
    } else {
        strategy.niche.clone()
    };

    Output::header(&format!("Reelsmith: {} (from saved strategy)", niche));
    Output::kv("Strategy", &strategy_file.display().to_string());

    let orchestrator = Orchestrator::new(settings)?;

    let mut options = RunOptions::new(&niche);
    options.script_count = scripts;
    options.instructions = instructions.to_string();

    let spinner = Output::spinner("Generating scripts from saved strategy...");

    match orchestrator.generate_from_strategy(strategy, &options).await {
        Ok(report) => {
            spinner.finish_and_clear();
            print_report(&report);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate scripts: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
