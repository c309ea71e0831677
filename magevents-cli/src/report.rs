//! Report generation
//!
//! Each run produces one report holding its event table and interval
//! statistics, written as plain text or JSON.

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use magevents::{EventTable, IntervalCorrelation, IntervalTable};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything computed for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run: String,
    pub events: EventTable,
    pub averages: IntervalTable,
    pub total_variation: IntervalTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Vec<IntervalCorrelation>>,
}

/// Render a report in the requested format
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Txt => Ok(render_txt(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .with_context(|| format!("Failed to serialize report for run '{}'", report.run)),
    }
}

/// Write a report to `<output_dir>/<run>.<ext>`, or stdout without a
/// directory. Returns the written path.
pub fn write_report(
    report: &RunReport,
    format: OutputFormat,
    output_dir: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let content = render(report, format)?;

    let Some(dir) = output_dir else {
        println!("{}", content);
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    let path = dir.join(format!("{}.{}", file_stem(&report.run), format.extension()));
    fs::write(&path, content).with_context(|| format!("Failed to write report: {:?}", path))?;

    log::info!("Wrote report for run '{}' to {:?}", report.run, path);
    Ok(Some(path))
}

/// Report file name for a run; path separators and dots are replaced so
/// the report always lands directly inside the output directory
fn file_stem(run: &str) -> String {
    let stem: String = run
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "run".to_string()
    } else {
        stem
    }
}

fn render_txt(report: &RunReport) -> String {
    let mut out = String::new();
    let events = &report.events;

    let _ = writeln!(out, "═══════════════════════════════════════════════");
    let _ = writeln!(out, "  Run: {}", report.run);
    let _ = writeln!(out, "═══════════════════════════════════════════════");
    if let (Some(first), Some(last)) = (events.index().first(), events.index().last()) {
        let _ = writeln!(out, "  Samples: {} ({} .. {})", events.len(), first, last);
    }

    let _ = writeln!(out, "\nEvent flags:");
    for (name, count) in events.flag_counts() {
        let share = if events.is_empty() {
            0.0
        } else {
            100.0 * count as f64 / events.len() as f64
        };
        let _ = writeln!(out, "  {:<18} {:>6} samples ({:5.1}%)", name, count, share);
    }

    write_interval_table(&mut out, "Interval averages", &report.averages);
    write_interval_table(&mut out, "Interval total variation", &report.total_variation);

    if let Some(correlation) = &report.correlation {
        let _ = writeln!(out, "\nCross-correlation:");
        for entry in correlation {
            let lag = entry
                .best_lag
                .map(|lag| lag.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "  {}  best lag {}", entry.interval.start, lag);
        }
    }

    out
}

fn write_interval_table(out: &mut String, title: &str, table: &IntervalTable) {
    let _ = writeln!(out, "\n{} ({} intervals):", title, table.len());
    for (row, interval) in table.intervals().iter().enumerate() {
        let _ = writeln!(out, "  [{} .. {})", interval.start, interval.end);
        for (name, values) in table.columns() {
            let _ = writeln!(out, "    {:<24} {:>14.6e}", name, values[row]);
        }
    }
}

/// One line per run for the final summary
pub fn summary_line(report: &RunReport) -> String {
    let count = |name: &str| {
        report
            .events
            .flags(name)
            .map(magevents::count_flags)
            .unwrap_or(0)
    };
    format!(
        "{:<28} substorm {:>5}  DIP {:>5}  plasmoids {:>5}  clean {:>5}",
        report.run,
        count("substorm"),
        count("DIP"),
        count("plasmoids"),
        count("clean")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use magevents::Interval;

    fn report() -> RunReport {
        let t0 = Utc.with_ymd_and_hms(2022, 6, 6, 0, 0, 0).unwrap();
        let index = vec![t0, t0 + Duration::minutes(1)];
        let mut events = EventTable::new("stretched_LOWnHIGHu", index);
        events.push_flags("substorm", vec![true, false]).unwrap();
        events.push_flags("clean", vec![true, true]).unwrap();

        let mut averages = IntervalTable::new(vec![Interval::new(t0, t0 + Duration::hours(2))]);
        averages.set(0, "K1", 1.5e12);

        RunReport {
            run: "stretched_LOWnHIGHu".to_string(),
            events,
            averages: averages.clone(),
            total_variation: averages,
            correlation: None,
        }
    }

    #[test]
    fn test_txt_report() {
        let text = render(&report(), OutputFormat::Txt).unwrap();
        assert!(text.contains("Run: stretched_LOWnHIGHu"));
        assert!(text.contains("substorm"));
        assert!(text.contains("Interval averages (1 intervals)"));
    }

    #[test]
    fn test_json_report() {
        let text = render(&report(), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["run"], "stretched_LOWnHIGHu");
        assert_eq!(json["averages"]["columns"]["K1"][0], 1.5e12);
        assert!(json.get("correlation").is_none());
    }

    #[test]
    fn test_write_report_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&report(), OutputFormat::Json, Some(dir.path()))
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("stretched_LOWnHIGHu.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_report_stays_inside_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut escaping = report();
        escaping.run = "../../etc/stretched_LOWnHIGHu".to_string();

        let path = write_report(&escaping, OutputFormat::Txt, Some(dir.path()))
            .unwrap()
            .unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path, dir.path().join("______etc_stretched_LOWnHIGHu.txt"));
        assert_eq!(file_stem(""), "run");
        assert_eq!(file_stem("stretched_HIGHnLOWu"), "stretched_HIGHnLOWu");
    }

    #[test]
    fn test_summary_line() {
        let line = summary_line(&report());
        assert!(line.starts_with("stretched_LOWnHIGHu"));
        assert!(line.contains("substorm     1"));
    }
}
