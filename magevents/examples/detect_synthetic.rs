//! Run the full detector chain on a synthetic run
//!
//! Builds a six-hour run with one substorm-like disturbance, prints the
//! event flag counts and the per-interval K1 averages.
//!
//! Usage:
//!   detect_synthetic [ideals|steady] [-v]
//!
//! Example:
//!   detect_synthetic ideals -v

use chrono::{Duration, TimeZone, Utc};
use magevents::{
    build_events, CompositeSeries, EventConfig, IntervalAggregator, IntervalGeometry, Preset, Run,
    Signal, SignalSet, Timestamp,
};
use std::env;

const SAMPLES: usize = 360;

fn series(name: &str, index: &[Timestamp], f: impl Fn(f64) -> f64) -> Signal {
    let values = (0..index.len()).map(|i| f(i as f64)).collect();
    Signal::new(name, index.to_vec(), values).expect("synthetic series is well formed")
}

fn synthetic_run(t0: Timestamp) -> Run {
    let index: Vec<Timestamp> = (0..SAMPLES).map(|i| t0 + Duration::minutes(i as i64)).collect();
    let after = |t: f64, at: f64| if t >= at { 1.0 } else { 0.0 };

    let signals = SignalSet::new()
        .with_scalar(series("K1", &index, |t| 2e12 + 4e11 * (t / 20.0).sin()))
        .with_composite(
            CompositeSeries::new("closed")
                .with_column(series("Volume [Re^3]", &index, |t| 2000.0 - 60.0 * after(t, 200.0)))
                .with_column(series("M_night [kg]", &index, |t| 5e5 - 4e4 * after(t, 201.0)))
                .with_column(series("M [kg]", &index, |t| 6e5 - 9e4 * after(t, 201.0)))
                .with_column(series("u_db_night [J]", &index, |t| 4e15 - 8e14 * after(t, 199.0))),
        )
        .with_composite(
            CompositeSeries::new("mp")
                .with_column(series("X_NEXL [Re]", &index, |t| -28.0 + 7.0 * after(t, 198.0))),
        )
        .with_composite(
            CompositeSeries::new("index")
                .with_column(series("AL", &index, |t| -60.0 - 500.0 * after(t, 203.0))),
        )
        .with_composite(
            CompositeSeries::new("maggrid")
                .with_column(series("dBmin", &index, |t| -90.0 - 420.0 * after(t, 204.0))),
        );

    Run::new("stretched_LOWnHIGHu", signals)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|a| a == "-v");
    let preset = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .map(|a| a.parse::<Preset>())
        .transpose()
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        })
        .unwrap_or_default();

    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let t0 = Utc.with_ymd_and_hms(2022, 6, 6, 0, 0, 0).unwrap();
    let geometry = IntervalGeometry::from_minutes(t0 + Duration::minutes(10), 120, 120).unwrap();
    let config = EventConfig::new(geometry).with_epoch(t0).with_preset(preset);
    let run = synthetic_run(t0);

    let table = match build_events(&run, &config) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Detection failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("Run {} ({} preset, {} samples)", table.run(), preset, table.len());
    for (name, count) in table.flag_counts() {
        println!("  {:<18} {:>5}", name, count);
    }

    let aggregator = IntervalAggregator::new(&config).unwrap();
    let averages = aggregator.interval_average(&run.signals).unwrap();
    println!("\nK1 interval averages:");
    if let Some(k1) = averages.column("K1") {
        for (interval, value) in averages.intervals().iter().zip(k1) {
            println!("  {} .. {}  {:.3e}", interval.start, interval.end, value);
        }
    }
}
