//! compare-estimates: coverage report between two estimation files.
//!
//! ```bash
//! compare-estimates --actual wedmap_template.json \
//!     --predicted wedmap_estimation.json --output wedmap_report
//! ```

use clap::Parser;
use colored::Colorize;
use estimator_eval::{
    Comparison, CoverageStatus, EstimationDocument, Result, render_markdown, save_markdown,
    validate_threshold,
};
use estimator_telemetry::{LogSettings, init_telemetry};
use std::path::PathBuf;
use tracing::{info, warn};

/// Compare actual vs predicted estimation JSON files
#[derive(Parser, Debug)]
#[command(name = "compare-estimates")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the actual estimation JSON file
    #[arg(long)]
    actual: PathBuf,

    /// Path to the predicted estimation JSON file
    #[arg(long)]
    predicted: PathBuf,

    /// Output path without extension
    #[arg(long, default_value = "comparison_report")]
    output: PathBuf,

    /// Fuzzy matching threshold for epic names (0.0-1.0)
    #[arg(long, default_value_t = estimator_eval::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Only write the Markdown report
    #[arg(long)]
    no_pdf: bool,
}

fn percent(value: f64) -> colored::ColoredString {
    let text = format!("{:.2}%", value);
    match CoverageStatus::from_percentage(value) {
        CoverageStatus::Good => text.green(),
        CoverageStatus::Moderate => text.yellow(),
        CoverageStatus::Poor => text.red(),
    }
}

fn print_summary(comparison: &Comparison) {
    let hours = &comparison.hours;
    println!("{}", "Comparison Summary:".yellow().bold());
    println!(
        "  Hours:       {} actual, {} predicted ({:+.2}%, {})",
        hours.actual_hours,
        hours.predicted_hours,
        hours.difference_percentage,
        hours.status.to_string().cyan()
    );
    println!("  Platforms:   {}", percent(comparison.platforms.coverage_percentage));
    println!("  User Roles:  {}", percent(comparison.user_roles.coverage_percentage));
    println!(
        "  Epics:       {} ({} exact, {} fuzzy)",
        percent(comparison.epics.coverage_percentage),
        comparison.epics.exact_count(),
        comparison.epics.fuzzy_count()
    );
    println!("  Tasks:       {}", percent(comparison.tasks.overall_task_coverage));
    println!("  Overall:     {}", percent(comparison.overall_score()));
    println!();
}

fn run(cli: Cli) -> Result<()> {
    let threshold = validate_threshold(cli.threshold)?;
    let actual = EstimationDocument::load(&cli.actual)?;
    let predicted = EstimationDocument::load(&cli.predicted)?;
    info!(
        actual_epics = actual.epics.len(),
        predicted_epics = predicted.epics.len(),
        threshold,
        "Comparing estimations"
    );

    let comparison = Comparison::run(&actual, &predicted, threshold);
    print_summary(&comparison);

    let report = render_markdown(&comparison, chrono::Local::now());
    let path = save_markdown(&report, &cli.output)?;
    println!("{} {}", "Markdown report saved:".green().bold(), path.display());

    if !cli.no_pdf {
        warn!("PDF output is not supported; only the Markdown report was written");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_telemetry("compare-estimates", &LogSettings::new("warn")) {
        eprintln!("{}: {}", "Telemetry Warning".yellow(), e);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
