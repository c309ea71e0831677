//! Fixed-width, fixed-stride time windows
//!
//! Intervals start at a caller-supplied reference time and are generated
//! until their start passes the end of the series. The final interval is
//! not clipped, so consumers can see when it only partially covers data.

use crate::types::{EventError, Result, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// A half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Interval {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Half-open membership test
    pub fn contains(&self, time: Timestamp) -> bool {
        self.start <= time && time < self.end
    }

    /// Open membership test `(start, end)`, used for interval statistics
    pub fn strictly_contains(&self, time: Timestamp) -> bool {
        self.start < time && time < self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// Interval geometry: reference start time, window length and stride
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGeometry {
    start: Timestamp,
    length: Duration,
    stride: Duration,
}

impl IntervalGeometry {
    /// Create a new geometry, rejecting non-positive length or stride
    pub fn new(start: Timestamp, length: Duration, stride: Duration) -> Result<Self> {
        validate(length, stride)?;
        Ok(Self {
            start,
            length,
            stride,
        })
    }

    /// Convenience constructor taking whole minutes
    pub fn from_minutes(start: Timestamp, length_minutes: i64, stride_minutes: i64) -> Result<Self> {
        Self::new(
            start,
            Duration::minutes(length_minutes),
            Duration::minutes(stride_minutes),
        )
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn stride(&self) -> Duration {
        self.stride
    }

    /// Build the intervals covering a series that ends at `series_end`
    pub fn intervals(&self, series_end: Timestamp) -> Result<Vec<Interval>> {
        build_intervals(self.start, self.length, self.stride, series_end)
    }
}

fn validate(length: Duration, stride: Duration) -> Result<()> {
    if stride <= Duration::zero() {
        return Err(EventError::config(format!(
            "interval stride must be positive, got {}s",
            stride.num_seconds()
        )));
    }
    if length <= Duration::zero() {
        return Err(EventError::config(format!(
            "interval length must be positive, got {}s",
            length.num_seconds()
        )));
    }
    Ok(())
}

/// Generate `[start, start+length)` windows advancing by `stride` while the
/// window start is before `series_end`
pub fn build_intervals(
    start: Timestamp,
    length: Duration,
    stride: Duration,
    series_end: Timestamp,
) -> Result<Vec<Interval>> {
    validate(length, stride)?;

    let mut intervals = Vec::new();
    let mut begin = start;
    while begin < series_end {
        intervals.push(Interval::new(begin, begin + length));
        begin = begin + stride;
    }

    log::trace!(
        "Built {} intervals from {} (length {}s, stride {}s)",
        intervals.len(),
        start,
        length.num_seconds(),
        stride.num_seconds()
    );
    Ok(intervals)
}
