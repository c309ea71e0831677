//! Magnetospheric Event Detection CLI
//!
//! Command-line front end for the magevents library. It adds:
//! - TOML analysis configuration
//! - JSON run file loading
//! - Parallel processing of independent runs
//! - Report generation (TXT/JSON)

use anyhow::{bail, Context, Result};
use clap::Parser;
use magevents::{build_events, EventConfig, IntervalAggregator};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

mod config;
mod input;
mod report;

use config::{AppConfig, OutputFormat};
use report::RunReport;

/// Magnetospheric event detection - flag substorm signatures in simulation runs
#[derive(Parser, Debug)]
#[command(name = "magevents-cli")]
#[command(about = "Detect and aggregate magnetospheric events in simulation runs", long_about = None)]
#[command(version)]
struct Args {
    /// Path to analysis configuration file (analysis.toml)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Run file(s) to process; replaces the configured list (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    run: Vec<PathBuf>,

    /// Output directory for reports (default: stdout)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Magnetospheric Event CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using detection library v{}", magevents::VERSION);

    log::info!("Loading configuration from: {:?}", args.config);
    let app = config::load_config(&args.config)?;
    let event_config = app.event_config()?;
    log::debug!("Configuration loaded successfully (preset: {})", event_config.preset);

    let runs = if args.run.is_empty() {
        app.input.runs.clone()
    } else {
        args.run.clone()
    };
    if runs.is_empty() {
        bail!("No run files given; list them under [input] runs or pass --run");
    }

    let format = args.format.unwrap_or(app.output.format);
    let output_dir = args.output.clone().or_else(|| app.output.output_dir.clone());

    // Runs are independent; results come back in input order
    let results: Vec<Result<RunReport>> = runs
        .par_iter()
        .map(|path| process_run(path, &app, &event_config))
        .collect();

    let mut summary = Vec::new();
    let mut failed = 0;
    for (path, result) in runs.iter().zip(results) {
        match result.and_then(|report| {
            report::write_report(&report, format, output_dir.as_deref())?;
            Ok(report)
        }) {
            Ok(report) => summary.push(report::summary_line(&report)),
            Err(e) => {
                failed += 1;
                log::error!("Run {:?} failed: {:#}", path, e);
            }
        }
    }

    if !args.quiet {
        println!("\n📊 Summary ({} of {} runs):", summary.len(), runs.len());
        for line in &summary {
            println!("  {}", line);
        }
    }

    if failed > 0 {
        bail!("{} of {} runs failed", failed, runs.len());
    }
    Ok(())
}

/// Load one run, build its event table and interval statistics
fn process_run(path: &Path, app: &AppConfig, config: &EventConfig) -> Result<RunReport> {
    let run = input::load_run(path)?;

    let events = build_events(&run, config)
        .with_context(|| format!("Event detection failed for run '{}'", run.name))?;

    let aggregator = IntervalAggregator::new(config)?;
    let averages = aggregator
        .interval_average(&run.signals)
        .with_context(|| format!("Interval averaging failed for run '{}'", run.name))?;
    let total_variation = aggregator
        .interval_total_variation(&run.signals)
        .with_context(|| format!("Total variation failed for run '{}'", run.name))?;

    let correlation = match &app.analysis.correlation {
        Some(c) => Some(
            aggregator
                .interval_correlation(&run.signals, &c.x, &c.y, c.xfactor, c.yfactor)
                .with_context(|| format!("Correlation failed for run '{}'", run.name))?,
        ),
        None => None,
    };

    Ok(RunReport {
        run: run.name,
        events,
        averages,
        total_variation,
        correlation,
    })
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
