use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cancel;
mod config;
mod csv_io;
mod models;
mod sequencer;


use crate::cancel::Cancellation;
use crate::config::{Settings, load_config};
use crate::sequencer::{
    MixReport, SortOptions, StrategyRegistry, evaluate_sequence, summarize, time_seed,
};

#[derive(Parser, Debug)]
#[command(name = "harmonic-sequencer")]
#[command(about = "Order DJ tracks into harmonic, energy-cycling sets on the Camelot wheel")]
#[command(version)]
struct Args {
    /// Path to the input CSV file (title, artist, bpm, energy, key)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Path to write the sorted CSV file [default: next to the input]
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Sorting strategy to apply [default: HARMONIC_STRATEGY or "default"]
    #[arg(short = 's', long = "strategy")]
    strategy: Option<String>,

    /// List available strategies and exit
    #[arg(long = "list-strategies")]
    list_strategies: bool,

    /// Maximum number of tracks to write (0 writes everything)
    #[arg(short = 'l', long = "limit")]
    limit: Option<usize>,

    /// Seed for tie-breaking decisions (0 is time-based)
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Abort sequencing after this many seconds
    #[arg(long = "timeout")]
    timeout: Option<u64>,

    /// Write a JSON report with summary statistics and transition scores
    #[arg(long = "report")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("harmonic_sequencer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_config()?;
    run(args, &settings)
}

fn run(args: Args, settings: &Settings) -> Result<()> {
    let registry = StrategyRegistry::default();

    if args.list_strategies {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        bail!(
            "input path is required (--input <path>); available strategies: {}",
            registry.names().join(", ")
        );
    };

    let strategy_name = args.strategy.as_deref().unwrap_or(&settings.strategy);
    let sorter = registry.get(strategy_name)?;

    let cancel = match args.timeout.or(settings.timeout_secs) {
        Some(secs) if secs > 0 => Cancellation::with_timeout(Duration::from_secs(secs)),
        _ => Cancellation::new(),
    };

    let seed = match args.seed {
        Some(0) => time_seed(),
        Some(seed) => seed,
        None => settings.seed.unwrap_or_else(time_seed),
    };
    let limit = args.limit.filter(|&limit| limit > 0);

    let tracks = csv_io::load_tracks(input, &cancel)?;

    let options = SortOptions {
        limit,
        seed: Some(seed),
    };
    let result = sequencer::sort(sorter.as_ref(), &tracks, &options, &cancel)?;
    println!("Using seed {seed}");

    let mut ordered = result.ordered;
    if let Some(limit) = limit.filter(|&limit| limit < ordered.len()) {
        ordered.truncate(limit);
        println!("Applying limit {limit}; writing first {} tracks", ordered.len());
    }
    for note in &result.notes {
        println!("Note: {note}");
    }

    let output = args
        .output
        .unwrap_or_else(|| derive_output_path(input, &settings.output_suffix));
    csv_io::save_tracks(&output, &ordered)?;

    println!(
        "Wrote {} tracks using {} strategy to {}",
        ordered.len(),
        result.strategy,
        output.display()
    );

    let report = MixReport {
        strategy: result.strategy,
        seed,
        generated_at: Utc::now().to_rfc3339(),
        summary: summarize(&ordered),
        evaluation: evaluate_sequence(&ordered),
        tracks: ordered,
    };
    print_summary(&report);

    if let Some(path) = args.report.as_deref() {
        write_report(path, &report)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &MixReport) {
    let summary = &report.summary;
    let eval = &report.evaluation;

    println!("\n=== MIX SUMMARY ===");
    println!(
        "Tracks: {} | Artists: {} | Avg BPM: {:.1}",
        summary.total_tracks, summary.artist_count, summary.average_bpm
    );
    println!(
        "BPM Range: {}-{} | Energy Range: {}-{}",
        summary.bpm_range.0, summary.bpm_range.1, summary.energy_range.0, summary.energy_range.1
    );
    println!(
        "Wraps: {} | Big jumps: {} | Invalid transitions: {} | Energy resets: {}",
        eval.wraps, eval.big_jumps, eval.invalid_transitions, eval.energy_resets
    );
    println!(
        "Max BPM jump: {:.1} | Score: {:.2} (lower is better)",
        eval.max_bpm_jump, eval.total
    );
}

fn write_report(path: &Path, report: &MixReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("create report directory")?;
    }
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

/// `<dir>/<stem><suffix><ext>`, falling back to `.csv` when the input has no extension
fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".csv".to_string());

    input.with_file_name(format!("{stem}{suffix}{ext}"))
}
