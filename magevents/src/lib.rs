//! Magnetospheric Event Detection Library
//!
//! A stateless library that turns the integrated time series of a global
//! magnetosphere simulation run into per-sample event flags (plasmoid
//! releases, dipolarizations, ground magnetic bays, coupling variability,
//! IMF transients) and reduces runs to per-interval statistics.
//!
//! # Architecture
//!
//! - Signals arrive as a typed [`SignalSet`] of scalar and composite series
//! - Detectors are pure functions of a signal and explicit parameters
//! - [`CompositeEventBuilder`] runs every detector and merges the flags
//!   into one [`EventTable`] per run
//! - [`IntervalAggregator`] reduces a run to [`IntervalTable`]s
//!
//! The library does NOT:
//! - Read or write files
//! - Run simulations or load their output formats
//! - Plot anything
//!
//! All I/O lives in the application layer (magevents-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use magevents::{build_events, EventConfig, IntervalGeometry, Preset, Run, SignalSet};
//!
//! let start = Utc.with_ymd_and_hms(2022, 6, 6, 0, 10, 0).unwrap();
//! let geometry = IntervalGeometry::from_minutes(start, 120, 120).unwrap();
//! let config = EventConfig::new(geometry).with_preset(Preset::Ideals);
//!
//! // Signals are produced by an external loader
//! let run = Run::new("stretched_LOWnHIGHu", SignalSet::new());
//!
//! match build_events(&run, &config) {
//!     Ok(table) => {
//!         for (name, count) in table.flag_counts() {
//!             println!("{}: {} samples", name, count);
//!         }
//!     }
//!     Err(e) => eprintln!("Detection failed: {}", e),
//! }
//! ```

// Public modules
pub mod aggregate;
pub mod composite;
pub mod config;
pub mod detect;
pub mod interval;
pub mod signals;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use aggregate::{cross_correlate, IntervalAggregator, IntervalCorrelation};
pub use composite::{build_events, CompositeEventBuilder};
pub use config::{AggregationParams, DetectorParams, EventConfig, Preset, SignalNames};
pub use detect::{Direction, Threshold};
pub use interval::{build_intervals, Interval, IntervalGeometry};
pub use signals::{CompositeSeries, Run, Series, Signal, SignalRef, SignalSet, SignalSetStats};
pub use table::{Column, EventTable, IntervalTable, NamedColumn};
pub use types::{count_flags, EventError, Flags, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
