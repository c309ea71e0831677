//! Event detectors
//!
//! Every detector is a pure function of a signal and its parameters that
//! returns per-sample flags (and sometimes an auxiliary metric). Samples are
//! addressed positionally; the timestamp index is only consulted by the
//! transient detector.
//!
//! The excursion detectors share two building blocks defined here: the
//! [`Direction`] in which a signal is "worsening" and the region-growing
//! rule ([`grow_region`]) that extends a flagged excursion past the end of
//! its search window while the signal keeps moving the same way.

pub mod bays;
pub mod extent;
pub mod transient;
pub mod variability;

pub use bays::{BayFlags, BayParams, GroundBayDetector};
pub use extent::{ExtentGrowingDetector, ExtentParams};
pub use transient::{SolarWindSpeed, TransientDetector, TransientParams};
pub use variability::{VariabilityDetector, VariabilityOutput, VariabilityParams, VariabilityWindow};

use serde::{Deserialize, Serialize};

/// Direction in which a signal moves during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// True if going from `from` to `to` moves in this direction
    pub fn worsens(self, from: f64, to: f64) -> bool {
        match self {
            Direction::Increase => to > from,
            Direction::Decrease => to < from,
        }
    }

    /// Position of the first extremum (max for Increase, min for Decrease)
    ///
    /// NaN samples are skipped; returns None if the window holds no number.
    pub fn extremum(self, window: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (pos, &value) in window.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if !self.worsens(current, value) => {}
                _ => best = Some((pos, value)),
            }
        }
        best.map(|(pos, _)| pos)
    }
}

/// Excursion threshold, absolute or relative to the starting sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    /// Raw change in signal units
    Absolute(f64),
    /// Change as a percentage of `|S[i]|`
    Relative(f64),
}

impl Threshold {
    /// Threshold value in its own units
    pub fn value(self) -> f64 {
        match self {
            Threshold::Absolute(v) | Threshold::Relative(v) => v,
        }
    }

    /// True if the move from `origin` to `extreme` is strictly larger than
    /// the threshold
    pub fn exceeded(self, origin: f64, extreme: f64) -> bool {
        let delta = (extreme - origin).abs();
        match self {
            Threshold::Absolute(limit) => delta > limit,
            Threshold::Relative(percent) => delta / origin.abs() * 100.0 > percent,
        }
    }
}

/// Region growing states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrowState {
    /// Excursion found, `[start, extreme]` not yet flagged
    Searching,
    /// Extremum sat on the window edge; follow the trend one sample at a time
    Extending,
    Done,
}

/// Flag `[start, extreme]`, then keep flagging past `extreme` while the
/// signal continues in `direction`, but only if `extreme` is the last
/// index of the search window (`window_last`).
///
/// Returns the last flagged index. The loop is bounded by the series
/// length, so malformed inputs cannot keep it running.
pub(crate) fn grow_region(
    values: &[f64],
    flags: &mut [bool],
    start: usize,
    extreme: usize,
    window_last: usize,
    direction: Direction,
) -> usize {
    let mut state = GrowState::Searching;
    let mut cursor = extreme;

    for _ in 0..values.len() + 2 {
        state = match state {
            GrowState::Searching => {
                flags[start..=extreme].iter_mut().for_each(|f| *f = true);
                if extreme == window_last {
                    GrowState::Extending
                } else {
                    GrowState::Done
                }
            }
            GrowState::Extending => match values.get(cursor + 1) {
                Some(&next) if direction.worsens(values[cursor], next) => {
                    cursor += 1;
                    flags[cursor] = true;
                    GrowState::Extending
                }
                _ => GrowState::Done,
            },
            GrowState::Done => break,
        };
    }

    cursor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extremum_takes_first_occurrence() {
        let window = [3.0, 1.0, 2.0, 1.0];
        assert_eq!(Direction::Decrease.extremum(&window), Some(1));
        assert_eq!(Direction::Increase.extremum(&window), Some(0));
        assert_eq!(Direction::Decrease.extremum(&[f64::NAN, 2.0, f64::NAN]), Some(1));
        assert_eq!(Direction::Decrease.extremum(&[]), None);
    }

    #[test]
    fn test_threshold_modes() {
        assert!(Threshold::Absolute(5.0).exceeded(100.0, 94.0));
        assert!(!Threshold::Absolute(5.0).exceeded(100.0, 95.0));

        // X-line at -20 Re retreating to -16 Re is a 20% move
        assert!(Threshold::Relative(15.0).exceeded(-20.0, -16.0));
        assert!(!Threshold::Relative(25.0).exceeded(-20.0, -16.0));
    }

    #[test]
    fn test_grow_region_follows_trend_past_window() {
        let values = [5.0, 4.0, 3.0, 2.0, 1.0, 2.0];
        let mut flags = vec![false; values.len()];

        // Window [0, 3): minimum at its last index, so growth continues to 4
        let last = grow_region(&values, &mut flags, 0, 2, 2, Direction::Decrease);
        assert_eq!(last, 4);
        assert_eq!(flags, vec![true, true, true, true, true, false]);
    }

    #[test]
    fn test_grow_region_stops_inside_window() {
        let values = [5.0, 4.0, 3.0, 2.0, 1.0];
        let mut flags = vec![false; values.len()];

        let last = grow_region(&values, &mut flags, 0, 1, 3, Direction::Decrease);
        assert_eq!(last, 1);
        assert_eq!(flags, vec![true, true, false, false, false]);
    }

    #[test]
    fn test_grow_region_is_bounded_by_series_end() {
        let values = [4.0, 3.0, 2.0, 1.0];
        let mut flags = vec![false; values.len()];

        let last = grow_region(&values, &mut flags, 0, 1, 1, Direction::Decrease);
        assert_eq!(last, 3);
        assert!(flags.iter().all(|f| *f));
    }
}
