//! Signal data model
//!
//! This module contains the time series types supplied by the external
//! loader and the per-run signal set that detectors consume.

pub mod series;
pub mod set;

// Re-export key types for convenience
pub use series::{CompositeSeries, Signal};
pub use set::{Run, Series, SignalRef, SignalSet, SignalSetStats};
