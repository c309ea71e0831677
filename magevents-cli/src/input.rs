//! JSON run files
//!
//! A run file is what the external simulation-result loader hands over: one
//! shared time index, flat scalar series and grouped composite series.
//!
//! ```json
//! {
//!   "name": "stretched_LOWnHIGHu",
//!   "index": ["2022-06-06T00:00:00Z", "2022-06-06T00:01:00Z"],
//!   "scalars": { "K1": [1.2e12, 1.3e12] },
//!   "composites": { "closed": { "Volume [Re^3]": [2100.0, 2098.5] } }
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use magevents::{CompositeSeries, Run, Signal, SignalSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// On-disk layout of one run
#[derive(Debug, Clone, Deserialize)]
pub struct RunFile {
    pub name: String,
    pub index: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub scalars: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub composites: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
}

impl RunFile {
    /// Validate every series against the shared index and build the run
    pub fn into_run(self) -> magevents::Result<Run> {
        let mut signals = SignalSet::new();

        for (name, values) in self.scalars {
            signals.insert_scalar(Signal::new(name, self.index.clone(), values)?);
        }
        for (group, columns) in self.composites {
            let mut composite = CompositeSeries::new(group);
            for (name, values) in columns {
                composite.insert(Signal::new(name, self.index.clone(), values)?);
            }
            signals.insert_composite(composite);
        }

        Ok(Run::new(self.name, signals))
    }
}

/// Load and validate a run file
pub fn load_run(path: &Path) -> Result<Run> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file: {:?}", path))?;

    let file: RunFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse run file: {:?}", path))?;

    let run = file
        .into_run()
        .with_context(|| format!("Invalid series in run file: {:?}", path))?;

    let stats = run.signals.stats();
    log::debug!(
        "Loaded run '{}': {} scalars, {} groups ({} columns)",
        run.name,
        stats.num_scalars,
        stats.num_composites,
        stats.num_columns
    );
    Ok(run)
}
