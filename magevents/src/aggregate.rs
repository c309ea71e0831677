//! Per-interval statistics for cross-run comparison
//!
//! The aggregator cuts a run into the intervals described by the
//! configured [`IntervalGeometry`](crate::interval::IntervalGeometry) and
//! reduces every scalar series to one value per interval. Statistics use
//! the samples strictly inside each interval, so a sample sitting exactly
//! on a boundary belongs to neither neighbour.

use crate::config::EventConfig;
use crate::interval::Interval;
use crate::signals::{SignalRef, SignalSet};
use crate::table::IntervalTable;
use crate::types::{EventError, Result};
use serde::Serialize;

/// Cross-correlation of two signals over one interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalCorrelation {
    pub interval: Interval,
    /// Lags `-(ny-1)..=(nx-1)` in samples
    pub lags: Vec<i64>,
    /// Correlation value per lag
    pub values: Vec<f64>,
    /// Lag of the first maximum, if the interval held data for both signals
    pub best_lag: Option<i64>,
}

/// Interval statistics over the signals of one run
pub struct IntervalAggregator<'a> {
    config: &'a EventConfig,
}

impl<'a> IntervalAggregator<'a> {
    pub fn new(config: &'a EventConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Intervals covering the run, ending at the reference signal's last
    /// timestamp
    pub fn intervals(&self, set: &SignalSet) -> Result<Vec<Interval>> {
        let reference = set.get(&self.config.signals.reference)?;
        let end = reference.end_time().ok_or_else(|| {
            EventError::shape(format!("reference signal '{}' is empty", reference.name()))
        })?;
        self.config.geometry.intervals(end)
    }

    /// Mean of every scalar series per interval
    ///
    /// Composite groups are skipped, except the solar-wind group whose
    /// columns are not averaged: each is sampled at the interval start
    /// shifted back by the offset between the first interval and the
    /// simulation epoch, so the driving conditions line up with the
    /// response they produce.
    pub fn interval_average(&self, set: &SignalSet) -> Result<IntervalTable> {
        let intervals = self.intervals(set)?;
        let mut table = IntervalTable::new(intervals.clone());
        let solar_wind = self.config.aggregation.solar_wind_group.as_deref();

        let Some(first) = intervals.first() else {
            return Ok(table);
        };
        let shift = first.start - self.config.epoch;

        for signal in set.scalars() {
            for (row, interval) in intervals.iter().enumerate() {
                let window = signal.values_between(interval.start, interval.end);
                table.set(row, signal.name(), mean(window));
            }
        }

        if let Some(group) = solar_wind.and_then(|name| set.composite(name)) {
            for signal in group.columns() {
                let column = SignalRef::column(group.name(), signal.name()).to_string();
                for (row, interval) in intervals.iter().enumerate() {
                    let value = signal.value_at(interval.start - shift).unwrap_or(f64::NAN);
                    table.set(row, &column, value);
                }
            }
        }

        log::debug!(
            "Averaged {} series over {} intervals",
            set.stats().num_scalars,
            table.len()
        );
        Ok(table)
    }

    /// Total variation `sum |S[i+1] - S[i]|` of every scalar series per
    /// interval
    pub fn interval_total_variation(&self, set: &SignalSet) -> Result<IntervalTable> {
        let intervals = self.intervals(set)?;
        let mut table = IntervalTable::new(intervals.clone());
        let watched = self.config.aggregation.outlier_signal.as_deref();
        let ratio = self.config.aggregation.outlier_ratio;

        for signal in set.scalars() {
            for (row, interval) in intervals.iter().enumerate() {
                let window = signal.values_between(interval.start, interval.end);
                let variation = total_variation(window);
                table.set(row, signal.name(), variation);

                if Some(signal.name()) == watched {
                    let scale = mean_abs(window);
                    if variation / scale > ratio {
                        log::warn!(
                            "Outlier in '{}' over [{}, {}): total variation {:.3e} is {:.0}x mean |S|",
                            signal.name(),
                            interval.start,
                            interval.end,
                            variation,
                            variation / scale
                        );
                    }
                }
            }
        }

        Ok(table)
    }

    /// Cross-correlation of `x / xfactor` against `y / yfactor` per interval
    ///
    /// The factors rescale the inputs into comparable units (e.g. `1e12`
    /// turns W into TW) before the products are formed.
    pub fn interval_correlation(
        &self,
        set: &SignalSet,
        x: &SignalRef,
        y: &SignalRef,
        xfactor: f64,
        yfactor: f64,
    ) -> Result<Vec<IntervalCorrelation>> {
        if xfactor == 0.0 || yfactor == 0.0 || !xfactor.is_finite() || !yfactor.is_finite() {
            return Err(EventError::config(format!(
                "correlation scale factors must be finite and non-zero, got {} and {}",
                xfactor, yfactor
            )));
        }

        let xs = set.get(x)?;
        let ys = set.get(y)?;
        let intervals = self.intervals(set)?;

        let correlations = intervals
            .into_iter()
            .map(|interval| {
                let xw: Vec<f64> = xs
                    .values_between(interval.start, interval.end)
                    .iter()
                    .map(|v| v / xfactor)
                    .collect();
                let yw: Vec<f64> = ys
                    .values_between(interval.start, interval.end)
                    .iter()
                    .map(|v| v / yfactor)
                    .collect();
                let (lags, values) = cross_correlate(&xw, &yw);
                let best_lag = first_argmax(&values).map(|pos| lags[pos]);
                IntervalCorrelation {
                    interval,
                    lags,
                    values,
                    best_lag,
                }
            })
            .collect::<Vec<_>>();

        log::debug!("Correlated '{}' with '{}' over {} intervals", x, y, correlations.len());
        Ok(correlations)
    }
}

/// Full discrete cross-correlation `c[k] = sum_n x[n+k] * y[n]`
///
/// Returns the lags `-(ny-1)..=(nx-1)` and the value at each. Either input
/// being empty yields empty output.
pub fn cross_correlate(x: &[f64], y: &[f64]) -> (Vec<i64>, Vec<f64>) {
    if x.is_empty() || y.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let nx = x.len() as i64;
    let ny = y.len() as i64;

    let lags: Vec<i64> = (-(ny - 1)..=nx - 1).collect();
    let values = lags
        .iter()
        .map(|&k| {
            let first = (-k).max(0);
            let last = (nx - k).min(ny);
            (first..last)
                .map(|n| x[(n + k) as usize] * y[n as usize])
                .sum()
        })
        .collect();
    (lags, values)
}

fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (pos, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((pos, value)),
        }
    }
    best.map(|(pos, _)| pos)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_abs(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
}

/// NaN for an empty window, zero for a single sample
fn total_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.windows(2).map(|pair| (pair[1] - pair[0]).abs()).sum()
}
