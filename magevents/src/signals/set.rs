//! Per-run signal sets
//!
//! A [`SignalSet`] holds everything the external loader produced for one
//! simulation run. Flat scalar series and composite groups are kept apart
//! so that aggregation can dispatch on the variant instead of filtering
//! names through exclusion lists.

use super::series::{CompositeSeries, Signal};
use crate::types::{EventError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Address of one series inside a [`SignalSet`]
///
/// Written as `name` for a scalar series or `group/column` for a column of
/// a composite series, e.g. `closed/Volume [Re^3]`. The text splits at the
/// first `/`; a scalar whose name contains `/` (e.g. `K1 [W/Re^2]`) is
/// still found because lookup falls back to the full text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalRef {
    /// Composite group name (None for a scalar series)
    pub group: Option<String>,
    /// Scalar name or column name
    pub name: String,
}

impl SignalRef {
    /// Reference a scalar series
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
        }
    }

    /// Reference a column of a composite series
    pub fn column(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}/{}", group, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for SignalRef {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((group, name)) if !group.is_empty() && !name.is_empty() => {
                Ok(SignalRef::column(group, name))
            }
            Some(_) => Err(EventError::config(format!("malformed signal reference '{}'", s))),
            None if s.is_empty() => Err(EventError::config("empty signal reference")),
            None => Ok(SignalRef::scalar(s)),
        }
    }
}

impl TryFrom<String> for SignalRef {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SignalRef> for String {
    fn from(value: SignalRef) -> Self {
        value.to_string()
    }
}

/// One entry of a signal set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Series {
    /// A flat scalar series; the only kind interval aggregation consumes
    Scalar(Signal),
    /// A group of related scalar series
    Composite(CompositeSeries),
}

/// A run's mapping of name → series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSet {
    series: BTreeMap<String, Series>,
}

impl SignalSet {
    /// Create an empty signal set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a scalar series
    pub fn with_scalar(mut self, signal: Signal) -> Self {
        self.insert_scalar(signal);
        self
    }

    /// Builder method: add a composite series
    pub fn with_composite(mut self, composite: CompositeSeries) -> Self {
        self.insert_composite(composite);
        self
    }

    /// Add (or replace) a scalar series
    pub fn insert_scalar(&mut self, signal: Signal) {
        self.series
            .insert(signal.name().to_string(), Series::Scalar(signal));
    }

    /// Add (or replace) a composite series
    pub fn insert_composite(&mut self, composite: CompositeSeries) {
        self.series
            .insert(composite.name().to_string(), Series::Composite(composite));
    }

    /// Iterate over scalar series in name order
    pub fn scalars(&self) -> impl Iterator<Item = &Signal> {
        self.series.values().filter_map(|s| match s {
            Series::Scalar(signal) => Some(signal),
            Series::Composite(_) => None,
        })
    }

    /// Iterate over composite series in name order
    pub fn composites(&self) -> impl Iterator<Item = &CompositeSeries> {
        self.series.values().filter_map(|s| match s {
            Series::Composite(composite) => Some(composite),
            Series::Scalar(_) => None,
        })
    }

    /// Look up a scalar series by name
    pub fn scalar(&self, name: &str) -> Option<&Signal> {
        match self.series.get(name) {
            Some(Series::Scalar(signal)) => Some(signal),
            _ => None,
        }
    }

    /// Look up a composite series by name
    pub fn composite(&self, name: &str) -> Option<&CompositeSeries> {
        match self.series.get(name) {
            Some(Series::Composite(composite)) => Some(composite),
            _ => None,
        }
    }

    /// Resolve a reference, failing with `MissingSignal` if it is absent
    pub fn get(&self, reference: &SignalRef) -> Result<&Signal> {
        let found = match &reference.group {
            Some(group) => self
                .composite(group)
                .and_then(|c| c.column(&reference.name))
                .or_else(|| self.scalar(&reference.to_string())),
            None => self.scalar(&reference.name),
        };
        found.ok_or_else(|| EventError::MissingSignal(reference.to_string()))
    }

    /// Get signal set statistics
    pub fn stats(&self) -> SignalSetStats {
        let composites: Vec<&CompositeSeries> = self.composites().collect();
        SignalSetStats {
            num_scalars: self.scalars().count(),
            num_composites: composites.len(),
            num_columns: composites.iter().map(|c| c.len()).sum(),
        }
    }
}

/// Signal set statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSetStats {
    /// Number of scalar series
    pub num_scalars: usize,
    /// Number of composite groups
    pub num_composites: usize,
    /// Total number of columns across composite groups
    pub num_columns: usize,
}

/// One simulation case: a run identifier and its signals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    /// Run identifier, e.g. `stretched_LOWnHIGHu`
    pub name: String,
    /// Signals produced by the external loader
    pub signals: SignalSet,
}

impl Run {
    /// Create a new run
    pub fn new(name: impl Into<String>, signals: SignalSet) -> Self {
        Self {
            name: name.into(),
            signals,
        }
    }
}
