//! Run command - the full scrape-to-scripts pipeline.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunOptions, RunReport};
use anyhow::Result;
use std::path::PathBuf;

/// Run the full pipeline.
#[allow(clippy::too_many_arguments)]
pub async fn run_pipeline(
    niche: &str,
    targets: Vec<String>,
    min_views: Option<u64>,
    max_reels: Option<usize>,
    scripts: Option<usize>,
    instructions: &str,
    force_refresh: bool,
    skip_download: bool,
    strategy_file: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    // A saved strategy skips scraping, so the lighter checks suffice.
    let operation = if strategy_file.is_some() {
        Operation::Generate
    } else {
        Operation::Run
    };
    if let Err(e) = preflight::check(operation) {
        Output::error(&format!("{}", e));
        Output::info("Run 'reelsmith doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let mut options = RunOptions::new(niche);
    if !targets.is_empty() {
        options.targets = Some(targets);
    }
    options.min_views = min_views;
    options.max_reels = max_reels;
    options.script_count = scripts;
    options.instructions = instructions.to_string();
    options.force_refresh = force_refresh;
    options.skip_download = skip_download;
    options.strategy_file = strategy_file;

    Output::header(&format!("Reelsmith: {}", niche));
    let report = orchestrator.run(options).await?;

    print_report(&report);
    Ok(())
}

/// Print the run summary shared by the run and gen commands.
pub(super) fn print_report(report: &RunReport) {
    Output::header("Run Summary");
    Output::kv("Run", &report.run_id);
    if report.fetched > 0 {
        Output::kv(
            "Reels",
            &format!(
                "{} fetched, {} kept, {} analyzed ({} from cache)",
                report.fetched, report.kept, report.analyzed, report.cache_hits
            ),
        );
    }
    Output::kv("Scripts", &report.scripts_generated.to_string());

    let analyzed: Vec<_> = report
        .items
        .iter()
        .filter(|i| i.analysis.is_some())
        .collect();
    if !analyzed.is_empty() {
        Output::header("Analyzed Reels");
        for item in analyzed {
            Output::reel_info(&item.reel.shortcode, &item.reel.owner_username, item.reel.views);
        }
    }

    let failed = report.failed_items();
    if !failed.is_empty() {
        Output::warning(&format!("{} reel(s) failed and were excluded:", failed.len()));
        for (shortcode, failure) in failed {
            Output::list_item(&format!("{}: {} ({})", shortcode, failure.message, failure.stage));
        }
    }

    for failure in &report.write_failures {
        Output::warning(&format!("Artifact not written: {}", failure));
    }

    if !report.artifacts.is_empty() {
        Output::header("Artifacts");
        for path in &report.artifacts {
            Output::list_item(&path.display().to_string());
        }
    }

    if let Some(first) = report.scripts.first() {
        Output::header("Script Hooks");
        for script in &report.scripts {
            Output::script_preview(script.index, &script.hook_type, &script.hook);
        }

        Output::header("Preview");
        println!("{}", first.render());
        Output::success(&format!(
            "{} scripts ready. Full text in the scripts_*.txt artifact.",
            report.scripts_generated
        ));
    }
}
