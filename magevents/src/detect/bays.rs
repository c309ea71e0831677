//! Ground magnetic bay (substorm onset) detector
//!
//! Follows the onset criteria of Borovsky & Yakymenko (2017) applied to a
//! westward ground index such as AL, SML or a virtual-magnetometer minimum:
//!
//! 1. the index drops by more than `drop_threshold` within `drop_window`,
//! 2. it drops by more than `sharp_drop_threshold` within `sharp_window`,
//! 3. no onset was flagged in the preceding `refractory` samples.
//!
//! A candidate is a true onset if the forward integral of the index over
//! `integral_window` is less than `onset_ratio` times the backward integral,
//! otherwise it is recorded as a pseudo-breakup. Either way the bay is
//! flagged down to the window minimum and grown while the index keeps
//! falling.

use super::{grow_region, Direction};
use crate::signals::Signal;
use crate::types::{count_flags, EventError, Flags, Result};
use serde::{Deserialize, Serialize};

/// Ground bay detector parameters; windows are in samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayParams {
    /// Minimum bay depth in nT
    pub drop_threshold: f64,
    /// Window for the bay depth (15 one-minute samples)
    pub drop_window: usize,
    /// Minimum sharp drop in nT
    pub sharp_drop_threshold: f64,
    /// Window for the sharp drop (2 one-minute samples)
    pub sharp_window: usize,
    /// Samples after an onset during which no new onset is accepted
    pub refractory: usize,
    /// Forward / backward integration length (45 one-minute samples)
    pub integral_window: usize,
    /// Forward integral must be below this multiple of the backward one
    pub onset_ratio: f64,
    /// Sample spacing used by the trapezoid integrals
    pub sample_seconds: f64,
}

impl Default for BayParams {
    fn default() -> Self {
        Self {
            drop_threshold: 150.0,
            drop_window: 15,
            sharp_drop_threshold: 10.0,
            sharp_window: 2,
            refractory: 15,
            integral_window: 45,
            onset_ratio: 1.5,
            sample_seconds: 60.0,
        }
    }
}

impl BayParams {
    pub fn validate(&self) -> Result<()> {
        if self.drop_window == 0 || self.sharp_window == 0 || self.integral_window == 0 {
            return Err(EventError::config("bay detector windows must be at least 1 sample"));
        }
        if !(self.drop_threshold > 0.0) || !(self.sharp_drop_threshold > 0.0) {
            return Err(EventError::config(format!(
                "bay thresholds must be positive, got {} / {}",
                self.drop_threshold, self.sharp_drop_threshold
            )));
        }
        if !(self.sample_seconds > 0.0) {
            return Err(EventError::config("bay sample spacing must be positive"));
        }
        Ok(())
    }
}

/// Bay detector output
#[derive(Debug, Clone, PartialEq)]
pub struct BayFlags {
    /// Every sample inside a bay
    pub bays: Flags,
    /// Bay starts classified as substorm onsets
    pub onsets: Flags,
    /// Bay starts classified as pseudo-breakups
    pub pseudos: Flags,
}

/// Ground magnetic bay detector
#[derive(Debug, Clone)]
pub struct GroundBayDetector {
    params: BayParams,
}

impl GroundBayDetector {
    /// Create a detector, validating its parameters
    pub fn new(params: BayParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &BayParams {
        &self.params
    }

    /// Run the detector on a ground index signal
    pub fn detect(&self, signal: &Signal) -> Result<BayFlags> {
        let flags = self.detect_values(signal.values()).map_err(|e| match e {
            EventError::InputShape(msg) => {
                EventError::InputShape(format!("{} (signal '{}')", msg, signal.name()))
            }
            other => other,
        })?;

        log::debug!(
            "Bay detector on '{}': {} bay samples, {} onsets, {} pseudo-breakups",
            signal.name(),
            count_flags(&flags.bays),
            count_flags(&flags.onsets),
            count_flags(&flags.pseudos)
        );
        Ok(flags)
    }

    /// Run the detector on raw values
    pub fn detect_values(&self, values: &[f64]) -> Result<BayFlags> {
        let p = &self.params;
        let n = values.len();
        let span = p.integral_window;

        if n <= 2 * span {
            return Err(EventError::shape(format!(
                "bay detector needs more than {} samples, got {}",
                2 * span,
                n
            )));
        }

        let mut bays = vec![false; n];
        let mut onsets = vec![false; n];
        let mut pseudos = vec![false; n];

        for i in span..n - span {
            let index = values[i];

            let drop_end = (i + p.drop_window).min(n);
            let Some(pos) = Direction::Decrease.extremum(&values[i..drop_end]) else {
                continue;
            };
            let minimum = i + pos;
            if !(index - values[minimum] > p.drop_threshold) {
                continue;
            }

            // Pseudo-breakups do not start a refractory period
            let recent_onset = onsets[i.saturating_sub(p.refractory)..i].iter().any(|f| *f);
            let sharp_end = (i + p.sharp_window).min(n);
            let sharp_min = values[i..sharp_end]
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min);
            if recent_onset || !(index - sharp_min > p.sharp_drop_threshold) {
                continue;
            }

            let forward = trapezoid(&values[i..i + span], p.sample_seconds);
            let backward = trapezoid(&values[i - span..i], p.sample_seconds);
            if forward < p.onset_ratio * backward {
                onsets[i] = true;
            } else {
                pseudos[i] = true;
            }

            grow_region(values, &mut bays, i, minimum, drop_end - 1, Direction::Decrease);
        }

        Ok(BayFlags {
            bays,
            onsets,
            pseudos,
        })
    }
}

/// Trapezoid-rule integral with uniform spacing
fn trapezoid(values: &[f64], dx: f64) -> f64 {
    values
        .windows(2)
        .map(|pair| (pair[0] + pair[1]) / 2.0 * dx)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quiet index at -50 nT with a bay starting at `start`
    fn bay_series(n: usize, start: usize, depth: f64, recovery: f64) -> Vec<f64> {
        let mut values = vec![-50.0; n];
        for (k, value) in values.iter_mut().enumerate().skip(start) {
            let t = (k - start) as f64;
            *value = if t <= 5.0 {
                -50.0 - depth * t / 5.0
            } else {
                (-50.0 - depth + recovery * (t - 5.0)).min(-50.0)
            };
        }
        values
    }

    #[test]
    fn test_trapezoid() {
        assert_eq!(trapezoid(&[1.0, 1.0, 1.0], 60.0), 120.0);
        assert_eq!(trapezoid(&[0.0, 2.0], 1.0), 1.0);
        assert_eq!(trapezoid(&[5.0], 60.0), 0.0);
    }

    #[test]
    fn test_bay_flagged_down_to_minimum() {
        let values = bay_series(200, 100, 300.0, 2.0);
        let det = GroundBayDetector::new(BayParams::default()).unwrap();
        let flags = det.detect_values(&values).unwrap();

        // Sample 100 is the last quiet sample and the first one whose sharp
        // window sees the fall; the bay runs to the minimum at 105
        let flagged: Vec<usize> = (0..200).filter(|i| flags.bays[*i]).collect();
        assert_eq!(flagged, (100..=105).collect::<Vec<_>>());
        assert!(flags.onsets[100]);
        assert_eq!(count_flags(&flags.onsets), 1);
        assert_eq!(count_flags(&flags.pseudos), 0);
    }

    #[test]
    fn test_disturbed_background_gives_pseudo_breakup() {
        let mut values = vec![-400.0; 200];
        for k in 101..=105 {
            values[k] = -400.0 - 60.0 * (k - 100) as f64;
        }
        for k in 106..200 {
            values[k] = (-700.0 + 30.0 * (k - 105) as f64).min(-100.0);
        }

        let det = GroundBayDetector::new(BayParams::default()).unwrap();
        let flags = det.detect_values(&values).unwrap();

        assert!(flags.pseudos[100]);
        assert!(!flags.onsets[100]);
        assert_eq!(count_flags(&flags.onsets), 0);
        assert!(flags.bays[100..=105].iter().all(|f| *f));
        // Only onsets start a refractory period: every sample that still
        // sees a deep enough drop is its own pseudo-breakup
        let pseudos: Vec<usize> = (0..200).filter(|i| flags.pseudos[*i]).collect();
        assert_eq!(pseudos, vec![100, 101, 102]);
    }

    #[test]
    fn test_deepening_bay_is_onset() {
        // Forward integral more negative than backward: onset
        let values = bay_series(200, 100, 300.0, 0.0);
        let det = GroundBayDetector::new(BayParams::default()).unwrap();
        let flags = det.detect_values(&values).unwrap();
        assert!(flags.onsets[100]);
        assert!(!flags.pseudos[100]);
        // Refractory period suppresses an immediate second onset
        assert!(flags.onsets[101..115].iter().all(|f| !f));
    }

    #[test]
    fn test_quiet_index_has_no_bays() {
        let values: Vec<f64> = (0..200).map(|i| -40.0 - 5.0 * ((i as f64) * 0.2).sin()).collect();
        let det = GroundBayDetector::new(BayParams::default()).unwrap();
        let flags = det.detect_values(&values).unwrap();
        assert_eq!(count_flags(&flags.bays), 0);
        assert_eq!(count_flags(&flags.onsets), 0);
        assert_eq!(count_flags(&flags.pseudos), 0);
    }

    #[test]
    fn test_rejects_short_series() {
        let det = GroundBayDetector::new(BayParams::default()).unwrap();
        let err = det.detect_values(&[-50.0; 90]).unwrap_err();
        assert!(matches!(err, EventError::InputShape(_)));
    }
}
