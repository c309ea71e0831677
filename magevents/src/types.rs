//! Core types for the event detection library
//!
//! This module defines the fundamental types shared by every detector: the
//! timestamp type, the per-sample flag vector and the error enum. Detectors
//! are pure functions of their inputs, so every failure is reported through
//! [`EventError`] and nothing is retried.

use chrono::{DateTime, Utc};

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Result type for detector and aggregation operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Per-sample boolean flags produced by a detector
pub type Flags = Vec<bool>;

/// Errors that can occur while detecting events or aggregating intervals
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    /// A signal is too short for the requested window, or two series that
    /// must share an index do not
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// Degenerate or non-terminating parameters (non-positive stride,
    /// zero thresholds, unparseable run identifier, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A signal required by a detector is absent from the run
    #[error("Missing signal: {0}")]
    MissingSignal(String),
}

impl EventError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        EventError::InputShape(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EventError::Configuration(msg.into())
    }
}

/// Number of set entries in a flag vector
pub fn count_flags(flags: &[bool]) -> usize {
    flags.iter().filter(|f| **f).count()
}

/// Convert flags to the 0/1 numeric encoding used by event tables
pub fn flags_as_f64(flags: &[bool]) -> Vec<f64> {
    flags.iter().map(|f| if *f { 1.0 } else { 0.0 }).collect()
}
