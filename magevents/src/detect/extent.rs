//! Threshold-excursion detector with region growing
//!
//! Scans a series for places where it starts moving in a "worsening"
//! direction and, within a lookahead window, travels further than a
//! threshold. The excursion from the starting sample to the window
//! extremum is flagged; if the extremum sits on the window edge the flagged
//! region keeps growing while the trend continues.
//!
//! Plasmoid releases (closed-region volume and mass drops) and
//! dipolarizations (X-line retreat, perturbation field energy drop) are all
//! instances of this detector with different parameters.

use super::{grow_region, Direction, Threshold};
use crate::signals::Signal;
use crate::types::{count_flags, EventError, Flags, Result};
use serde::{Deserialize, Serialize};

/// Parameters of one excursion detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtentParams {
    /// Direction the signal moves during an event
    pub direction: Direction,

    /// Search window length in samples (default: 10)
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Minimum excursion to flag
    pub threshold: Threshold,

    /// Offset of the extremum search from the candidate sample (default: 0)
    #[serde(default)]
    pub search_offset: usize,
}

fn default_lookahead() -> usize {
    10
}

impl ExtentParams {
    /// Create parameters with the default lookahead and no search offset
    pub fn new(direction: Direction, threshold: Threshold) -> Self {
        Self {
            direction,
            lookahead: default_lookahead(),
            threshold,
            search_offset: 0,
        }
    }

    /// Builder method: set the lookahead window
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Builder method: set the search offset
    pub fn with_search_offset(mut self, offset: usize) -> Self {
        self.search_offset = offset;
        self
    }

    /// Check the parameters describe a terminating, non-degenerate search
    pub fn validate(&self) -> Result<()> {
        if self.lookahead == 0 {
            return Err(EventError::config("excursion lookahead must be at least 1"));
        }
        if self.search_offset >= self.lookahead {
            return Err(EventError::config(format!(
                "search offset {} leaves an empty window of {} samples",
                self.search_offset, self.lookahead
            )));
        }
        if !(self.threshold.value() > 0.0) {
            return Err(EventError::config(format!(
                "excursion threshold must be positive, got {:?}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Excursion detector with region growing
#[derive(Debug, Clone)]
pub struct ExtentGrowingDetector {
    params: ExtentParams,
}

impl ExtentGrowingDetector {
    /// Create a detector, validating its parameters
    pub fn new(params: ExtentParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ExtentParams {
        &self.params
    }

    /// Run the detector on a signal
    pub fn detect(&self, signal: &Signal) -> Result<Flags> {
        let flags = self.detect_values(signal.values()).map_err(|e| match e {
            EventError::InputShape(msg) => {
                EventError::InputShape(format!("{} (signal '{}')", msg, signal.name()))
            }
            other => other,
        })?;

        log::debug!(
            "Excursion detector on '{}' ({:?}, {:?}): {} flagged samples",
            signal.name(),
            self.params.direction,
            self.params.threshold,
            count_flags(&flags)
        );
        Ok(flags)
    }

    /// Run the detector on raw values
    pub fn detect_values(&self, values: &[f64]) -> Result<Flags> {
        let ExtentParams {
            direction,
            lookahead,
            threshold,
            search_offset,
        } = self.params;
        let n = values.len();

        if n <= lookahead + search_offset {
            return Err(EventError::shape(format!(
                "excursion window of {} (+{} offset) needs more than {} samples, got {}",
                lookahead,
                search_offset,
                lookahead + search_offset,
                n
            )));
        }

        let mut flags = vec![false; n];
        for i in 0..n - lookahead - search_offset {
            if flags[i] || !direction.worsens(values[i], values[i + 1]) {
                continue;
            }

            let lo = i + search_offset;
            let hi = i + lookahead;
            let Some(pos) = direction.extremum(&values[lo..hi]) else {
                continue;
            };
            let extreme = lo + pos;

            if threshold.exceeded(values[i], values[extreme]) {
                grow_region(values, &mut flags, i, extreme, hi - 1, direction);
            }
        }

        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drop_detector(limit: f64, lookahead: usize) -> ExtentGrowingDetector {
        ExtentGrowingDetector::new(
            ExtentParams::new(Direction::Decrease, Threshold::Absolute(limit)).with_lookahead(lookahead),
        )
        .unwrap()
    }

    #[test]
    fn test_flags_drop_to_window_minimum() {
        let values = [10.0, 10.0, 9.0, 4.0, 6.0, 7.0, 8.0, 8.0, 8.0, 8.0];
        let flags = drop_detector(5.0, 4).detect_values(&values).unwrap();

        // Drop 10 -> 4 starts at index 1 (first falling step) and ends at 3
        assert_eq!(
            flags,
            vec![false, true, true, true, false, false, false, false, false, false]
        );
    }

    #[test]
    fn test_small_drop_ignored() {
        let values = [10.0, 9.0, 8.0, 7.0, 6.0, 6.0, 6.0, 6.0];
        let flags = drop_detector(5.0, 4).detect_values(&values).unwrap();
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_region_grows_past_window_edge() {
        // Monotone decline through the whole window and beyond
        let values = [20.0, 18.0, 16.0, 14.0, 12.0, 10.0, 8.0, 9.0, 9.0, 9.0];
        let flags = drop_detector(3.0, 3).detect_values(&values).unwrap();

        // Window [0,3) minimum at 2 (edge) -> grows through index 6
        assert!(flags[..=6].iter().all(|f| *f));
        assert!(flags[7..].iter().all(|f| !f));
    }

    #[test]
    fn test_relative_increase() {
        // X-line retreating from -30 Re to -20 Re
        let values = [-30.0, -28.0, -24.0, -20.0, -21.0, -22.0, -22.0, -22.0];
        let det = ExtentGrowingDetector::new(
            ExtentParams::new(Direction::Increase, Threshold::Relative(15.0)).with_lookahead(4),
        )
        .unwrap();
        let flags = det.detect_values(&values).unwrap();

        assert_eq!(&flags[..4], &[true, true, true, true]);
        assert!(flags[4..].iter().all(|f| !f));
    }

    #[test]
    fn test_search_offset_shifts_window() {
        let values = [10.0, 9.0, 1.0, 9.0, 9.5, 9.5, 9.5, 9.5];
        let det = ExtentGrowingDetector::new(
            ExtentParams::new(Direction::Decrease, Threshold::Absolute(5.0))
                .with_lookahead(4)
                .with_search_offset(3),
        )
        .unwrap();

        // The dip at index 2 lies before every offset window
        let flags = det.detect_values(&values).unwrap();
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_huge_threshold_flags_nothing() {
        let values: Vec<f64> = (0..100).map(|i| 1000.0 * ((i as f64) * 0.3).cos()).collect();
        let flags = drop_detector(1e12, 10).detect_values(&values).unwrap();
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_tail_beyond_last_candidate_is_unflagged() {
        // A drop that only starts within the final window is never a candidate
        let mut values = vec![50.0; 20];
        values[17] = 10.0;
        values[18] = 5.0;
        let flags = drop_detector(5.0, 10).detect_values(&values).unwrap();
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_rejects_bad_shape_and_config() {
        let err = drop_detector(5.0, 10).detect_values(&[1.0; 10]).unwrap_err();
        assert!(matches!(err, EventError::InputShape(_)));

        let err = ExtentGrowingDetector::new(ExtentParams::new(
            Direction::Decrease,
            Threshold::Absolute(0.0),
        ))
        .unwrap_err();
        assert!(matches!(err, EventError::Configuration(_)));

        let err = ExtentGrowingDetector::new(
            ExtentParams::new(Direction::Decrease, Threshold::Absolute(1.0)).with_lookahead(0),
        )
        .unwrap_err();
        assert!(matches!(err, EventError::Configuration(_)));
    }
}
