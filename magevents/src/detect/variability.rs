//! Rolling local total-variation ("unsteadiness") detector
//!
//! For each interior sample the detector sums the central differences over a
//! window of `lookbehind + lookahead + 1` samples and compares the result to
//! the sample's own magnitude. It also reports how far a window integral
//! would be off if the signal were assumed steady at the centre value.
//!
//! Samples closer than `lookbehind + 1` to the start or `lookahead + 1` to
//! the end are left at zero / unflagged.

use crate::signals::Signal;
use crate::types::{EventError, Flags, Result};
use serde::{Deserialize, Serialize};

/// Variability detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariabilityParams {
    /// Samples before the centre (default: 5)
    #[serde(default = "default_window")]
    pub lookbehind: usize,

    /// Samples after the centre (default: 5)
    #[serde(default = "default_window")]
    pub lookahead: usize,

    /// Unsteady threshold in percent of `|S[i]|`
    pub threshold: f64,
}

fn default_window() -> usize {
    5
}

impl VariabilityParams {
    /// Create parameters with the default ±5 sample window
    pub fn new(threshold: f64) -> Self {
        Self {
            lookbehind: default_window(),
            lookahead: default_window(),
            threshold,
        }
    }

    /// Builder method: set the window
    pub fn with_window(mut self, lookbehind: usize, lookahead: usize) -> Self {
        self.lookbehind = lookbehind;
        self.lookahead = lookahead;
        self
    }

    /// Check the threshold is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0) {
            return Err(EventError::config(format!(
                "variability threshold must be positive, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Smallest series this window can be applied to
    pub fn min_len(&self) -> usize {
        self.lookbehind + self.lookahead + 3
    }
}

/// An additional window width evaluated by the composite builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariabilityWindow {
    pub lookbehind: usize,
    pub lookahead: usize,
}

impl VariabilityWindow {
    pub fn new(lookbehind: usize, lookahead: usize) -> Self {
        Self {
            lookbehind,
            lookahead,
        }
    }
}

/// Detector output
#[derive(Debug, Clone, PartialEq)]
pub struct VariabilityOutput {
    /// `relvar` (percent) if the detector ran in relative mode, else `var`
    pub metric: Vec<f64>,
    /// `var[i] > |S[i]| * threshold / 100`
    pub unsteady: Flags,
    /// Percent error of the steady-state window integral
    pub integral_error: Vec<f64>,
}

/// Rolling variability detector
#[derive(Debug, Clone)]
pub struct VariabilityDetector {
    params: VariabilityParams,
}

impl VariabilityDetector {
    /// Create a detector, validating its parameters
    pub fn new(params: VariabilityParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &VariabilityParams {
        &self.params
    }

    /// Run the detector on a signal
    ///
    /// # Arguments
    /// * `signal` - Input series, reinterpreted on a 0..N-1 index
    /// * `relative` - Report `relvar` (percent of `|S[i]|`) instead of `var`
    pub fn detect(&self, signal: &Signal, relative: bool) -> Result<VariabilityOutput> {
        let output = self.detect_values(signal.values(), relative).map_err(|e| match e {
            EventError::InputShape(msg) => {
                EventError::InputShape(format!("{} (signal '{}')", msg, signal.name()))
            }
            other => other,
        })?;

        log::debug!(
            "Variability on '{}' (-{}/+{}): {} unsteady samples",
            signal.name(),
            self.params.lookbehind,
            self.params.lookahead,
            crate::types::count_flags(&output.unsteady)
        );
        Ok(output)
    }

    /// Run the detector on raw values
    pub fn detect_values(&self, values: &[f64], relative: bool) -> Result<VariabilityOutput> {
        let n = values.len();
        let behind = self.params.lookbehind;
        let ahead = self.params.lookahead;

        if n < self.params.min_len() {
            return Err(EventError::shape(format!(
                "variability window -{}/+{} needs at least {} samples, got {}",
                behind,
                ahead,
                self.params.min_len(),
                n
            )));
        }

        let width = (behind + ahead + 1) as f64;
        let mut var = vec![0.0; n];
        let mut relvar = vec![0.0; n];
        let mut unsteady = vec![false; n];
        let mut integral_error = vec![0.0; n];

        for i in behind + 1..n - ahead - 1 {
            let window = i - behind..=i + ahead;

            var[i] = window
                .clone()
                .map(|k| (values[k + 1] - values[k - 1]).abs() / 2.0)
                .sum();
            relvar[i] = var[i] / values[i].abs() * 100.0;
            unsteady[i] = var[i] > values[i].abs() * self.params.threshold / 100.0;

            let integ_true: f64 = window.map(|k| values[k]).sum();
            let integ_steady = width * values[i];
            integral_error[i] = (integ_steady - integ_true) / integ_true * 100.0;
        }

        Ok(VariabilityOutput {
            metric: if relative { relvar } else { var },
            unsteady,
            integral_error,
        })
    }
}
