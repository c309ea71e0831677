//! Event and interval tables
//!
//! An [`EventTable`] shares the reference signal's time index and holds one
//! column per detector or composite rule, in insertion order. An
//! [`IntervalTable`] holds one row per interval and one column per
//! aggregated signal.

use crate::interval::Interval;
use crate::types::{count_flags, flags_as_f64, EventError, Flags, Result, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// One event table column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum Column {
    /// Boolean detector or composite flags
    Flags(Flags),
    /// Continuous detector metric
    Metric(Vec<f64>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Flags(flags) => flags.len(),
            Column::Metric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view: flags as 0/1, metrics unchanged
    pub fn as_f64(&self) -> Vec<f64> {
        match self {
            Column::Flags(flags) => flags_as_f64(flags),
            Column::Metric(values) => values.clone(),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedColumn {
    pub name: String,
    #[serde(flatten)]
    pub column: Column,
}

/// Time-indexed table of detector outputs for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTable {
    run: String,
    index: Vec<Timestamp>,
    columns: Vec<NamedColumn>,
}

impl EventTable {
    /// Create an empty table over a time index
    pub fn new(run: impl Into<String>, index: Vec<Timestamp>) -> Self {
        Self {
            run: run.into(),
            index,
            columns: Vec::new(),
        }
    }

    /// Append a flag column; its length must match the index
    pub fn push_flags(&mut self, name: impl Into<String>, flags: Flags) -> Result<()> {
        self.push(name.into(), Column::Flags(flags))
    }

    /// Append a metric column; its length must match the index
    pub fn push_metric(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        self.push(name.into(), Column::Metric(values))
    }

    fn push(&mut self, name: String, column: Column) -> Result<()> {
        if column.len() != self.index.len() {
            return Err(EventError::shape(format!(
                "column '{}' has {} samples but the event table index has {}",
                name,
                column.len(),
                self.index.len()
            )));
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.column = column,
            None => self.columns.push(NamedColumn { name, column }),
        }
        Ok(())
    }

    /// Run identifier
    pub fn run(&self) -> &str {
        &self.run
    }

    /// Shared time index
    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All columns in insertion order
    pub fn columns(&self) -> &[NamedColumn] {
        &self.columns
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up any column
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.column)
    }

    /// Look up a flag column
    pub fn flags(&self, name: &str) -> Option<&[bool]> {
        match self.column(name) {
            Some(Column::Flags(flags)) => Some(flags),
            _ => None,
        }
    }

    /// Look up a metric column
    pub fn metric(&self, name: &str) -> Option<&[f64]> {
        match self.column(name) {
            Some(Column::Metric(values)) => Some(values),
            _ => None,
        }
    }

    /// Numeric view of any column (flags as 0/1)
    pub fn numeric(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name).map(Column::as_f64)
    }

    /// Number of flagged samples per flag column
    pub fn flag_counts(&self) -> Vec<(&str, usize)> {
        self.columns
            .iter()
            .filter_map(|c| match &c.column {
                Column::Flags(flags) => Some((c.name.as_str(), count_flags(flags))),
                Column::Metric(_) => None,
            })
            .collect()
    }
}

/// One row per interval, one column per aggregated signal
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IntervalTable {
    intervals: Vec<Interval>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl IntervalTable {
    /// Create a table with one row per interval; cells start as NaN
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self {
            intervals,
            columns: BTreeMap::new(),
        }
    }

    /// Set one cell, creating the column on first use
    pub fn set(&mut self, row: usize, column: &str, value: f64) {
        let rows = self.intervals.len();
        let values = self
            .columns
            .entry(column.to_string())
            .or_insert_with(|| vec![f64::NAN; rows]);
        if let Some(cell) = values.get_mut(row) {
            *cell = value;
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Look up a column
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Iterate over columns in name order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn index(n: usize) -> Vec<Timestamp> {
        let t0 = Utc.with_ymd_and_hms(2022, 6, 6, 0, 0, 0).unwrap();
        (0..n).map(|i| t0 + Duration::minutes(i as i64)).collect()
    }

    #[test]
    fn test_event_table_columns() {
        let mut table = EventTable::new("stretched_LOWnLOWu", index(3));
        table.push_flags("DIP", vec![true, false, true]).unwrap();
        table.push_metric("K1var", vec![0.0, 12.5, 0.0]).unwrap();

        assert_eq!(table.column_names(), vec!["DIP", "K1var"]);
        assert_eq!(table.flags("DIP"), Some(&[true, false, true][..]));
        assert_eq!(table.metric("DIP"), None);
        assert_eq!(table.numeric("DIP"), Some(vec![1.0, 0.0, 1.0]));
        assert_eq!(table.flag_counts(), vec![("DIP", 2)]);
    }

    #[test]
    fn test_event_table_rejects_misaligned_column() {
        let mut table = EventTable::new("run", index(3));
        let err = table.push_flags("DIP", vec![true]).unwrap_err();
        assert!(matches!(err, EventError::InputShape(_)));
    }

    #[test]
    fn test_event_table_replaces_same_name() {
        let mut table = EventTable::new("run", index(2));
        table.push_flags("K1unsteady", vec![false, false]).unwrap();
        table.push_flags("K1unsteady", vec![true, false]).unwrap();
        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.flags("K1unsteady"), Some(&[true, false][..]));
    }

    #[test]
    fn test_interval_table_defaults_to_nan() {
        let t = index(3);
        let mut table = IntervalTable::new(vec![Interval::new(t[0], t[1]), Interval::new(t[1], t[2])]);
        table.set(1, "K1", 4.0);

        let column = table.column("K1").unwrap();
        assert!(column[0].is_nan());
        assert_eq!(column[1], 4.0);
    }

    #[test]
    fn test_event_table_serializes_tagged_columns() {
        let mut table = EventTable::new("run", index(1));
        table.push_flags("clean", vec![true]).unwrap();
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["columns"][0]["name"], "clean");
        assert_eq!(json["columns"][0]["kind"], "flags");
        assert_eq!(json["columns"][0]["values"][0], true);
    }
}
