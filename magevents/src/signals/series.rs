//! Scalar and composite time series
//!
//! A [`Signal`] is an immutable, strictly time-ordered scalar series. A
//! [`CompositeSeries`] groups several related signals that were produced
//! together (e.g. the energetics of one sub-region of the magnetosphere).

use crate::types::{EventError, Result, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// An ordered scalar time series
///
/// The index is validated on construction to be strictly increasing and
/// the same length as the values. Detectors address samples positionally
/// (0..N-1); the index is only used for time-based windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    name: String,
    index: Vec<Timestamp>,
    values: Vec<f64>,
}

impl Signal {
    /// Create a new signal, validating the index
    pub fn new(name: impl Into<String>, index: Vec<Timestamp>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();

        if index.len() != values.len() {
            return Err(EventError::shape(format!(
                "signal '{}' has {} timestamps but {} values",
                name,
                index.len(),
                values.len()
            )));
        }

        if let Some(pos) = index.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(EventError::shape(format!(
                "signal '{}' index is not strictly increasing at position {}",
                name,
                pos + 1
            )));
        }

        Ok(Self { name, index, values })
    }

    /// Signal name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timestamp index
    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    /// Sample values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First timestamp, if any
    pub fn start_time(&self) -> Option<Timestamp> {
        self.index.first().copied()
    }

    /// Last timestamp, if any
    pub fn end_time(&self) -> Option<Timestamp> {
        self.index.last().copied()
    }

    /// Values whose timestamps lie strictly inside `(start, end)`
    pub fn values_between(&self, start: Timestamp, end: Timestamp) -> &[f64] {
        let lo = self.index.partition_point(|t| *t <= start);
        let hi = self.index.partition_point(|t| *t < end);
        if lo >= hi {
            &[]
        } else {
            &self.values[lo..hi]
        }
    }

    /// Value sampled at exactly `time`, if the index contains it
    pub fn value_at(&self, time: Timestamp) -> Option<f64> {
        self.index
            .binary_search(&time)
            .ok()
            .map(|pos| self.values[pos])
    }
}

/// A named group of related signals sharing one producer
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CompositeSeries {
    name: String,
    columns: BTreeMap<String, Signal>,
}

impl CompositeSeries {
    /// Create an empty composite series
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Builder method: add a column
    pub fn with_column(mut self, signal: Signal) -> Self {
        self.insert(signal);
        self
    }

    /// Add (or replace) a column
    pub fn insert(&mut self, signal: Signal) {
        self.columns.insert(signal.name().to_string(), signal);
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Signal> {
        self.columns.get(name)
    }

    /// Iterate over all columns in name order
    pub fn columns(&self) -> impl Iterator<Item = &Signal> {
        self.columns.values()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
