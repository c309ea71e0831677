//! IMF transient windows
//!
//! Each run in the parameter study switches its upstream driving at fixed
//! times. Until the new solar wind has crossed the simulation domain the
//! integrated quantities are still adjusting, so every sample inside a
//! window of length `domain extent / solar wind speed` after each switch is
//! flagged. The speed is encoded in the run identifier, e.g.
//! `stretched_LOWnHIGHu` (low density, high velocity).

use crate::interval::{build_intervals, IntervalGeometry};
use crate::types::{count_flags, EventError, Flags, Result, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Solar wind speed class of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarWindSpeed {
    Low,
    Medium,
    High,
}

impl SolarWindSpeed {
    /// Upstream X velocity in km/s
    pub fn km_per_s(self) -> f64 {
        match self {
            SolarWindSpeed::Low => 400.0,
            SolarWindSpeed::Medium => 600.0,
            SolarWindSpeed::High => 800.0,
        }
    }

    /// Parse the speed class from a run identifier
    ///
    /// The first `_`-separated part shaped `<density>n<speed>u...` with
    /// known classes decides; other parts and anything after the `u` are
    /// ignored (`stretched_LOWnLOWu_continued` is low speed).
    pub fn from_run(run: &str) -> Result<Self> {
        let mut unknown = None;
        for token in run.split('_') {
            let Some((density, rest)) = token.split_once('n') else {
                continue;
            };
            let Some((speed, _)) = rest.split_once('u') else {
                continue;
            };
            if parse_class(density).is_none() {
                continue;
            }
            match parse_class(speed) {
                Some(class) => return Ok(class),
                None => unknown = unknown.or(Some(speed)),
            }
        }

        Err(EventError::config(match unknown {
            Some(speed) => format!("unknown solar wind speed '{}' in run identifier '{}'", speed, run),
            None => format!("run identifier '{}' has no <density>n<speed>u token", run),
        }))
    }
}

fn parse_class(token: &str) -> Option<SolarWindSpeed> {
    match token {
        "LOW" => Some(SolarWindSpeed::Low),
        "MED" => Some(SolarWindSpeed::Medium),
        "HIGH" => Some(SolarWindSpeed::High),
        _ => None,
    }
}

impl fmt::Display for SolarWindSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolarWindSpeed::Low => write!(f, "LOW"),
            SolarWindSpeed::Medium => write!(f, "MED"),
            SolarWindSpeed::High => write!(f, "HIGH"),
        }
    }
}

/// Simulation domain extent used for the transit time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientParams {
    /// Sunward domain boundary in Earth radii
    pub xmax: f64,
    /// Tailward domain boundary in Earth radii
    pub xmin: f64,
    /// Earth radius in km
    pub earth_radius_km: f64,
    /// Fixed window length; when set the run's speed class is not used
    pub fixed_window_minutes: Option<i64>,
}

impl Default for TransientParams {
    fn default() -> Self {
        Self {
            xmax: 32.0,
            xmin: -150.0,
            earth_radius_km: 6371.0,
            fixed_window_minutes: None,
        }
    }
}

/// IMF transient detector
#[derive(Debug, Clone)]
pub struct TransientDetector {
    params: TransientParams,
}

impl TransientDetector {
    pub fn new(params: TransientParams) -> Result<Self> {
        if !(params.xmax > params.xmin) || !(params.earth_radius_km > 0.0) {
            return Err(EventError::config(format!(
                "degenerate simulation domain x in [{}, {}] Re",
                params.xmin, params.xmax
            )));
        }
        if let Some(minutes) = params.fixed_window_minutes {
            if minutes <= 0 {
                return Err(EventError::config(format!(
                    "fixed transient window must be positive, got {} min",
                    minutes
                )));
            }
        }
        Ok(Self { params })
    }

    /// Transit time across the domain for the run's solar wind speed
    pub fn window(&self, speed: SolarWindSpeed) -> Duration {
        let extent_km = (self.params.xmax - self.params.xmin) * self.params.earth_radius_km;
        let seconds = extent_km / speed.km_per_s();
        Duration::milliseconds((seconds * 1000.0).round() as i64)
    }

    /// Flag samples strictly inside any transient window
    ///
    /// Windows start at the geometry's reference start and repeat at its
    /// stride, matching the cadence of the driving changes.
    pub fn detect(&self, times: &[Timestamp], run: &str, geometry: &IntervalGeometry) -> Result<Flags> {
        let window = match self.params.fixed_window_minutes {
            Some(minutes) => Duration::minutes(minutes),
            None => self.window(SolarWindSpeed::from_run(run)?),
        };
        let Some(&last) = times.last() else {
            return Err(EventError::shape("transient detector needs a non-empty time index"));
        };

        let intervals = build_intervals(geometry.start(), window, geometry.stride(), last)?;
        let flags: Flags = times
            .iter()
            .map(|t| intervals.iter().any(|iv| iv.strictly_contains(*t)))
            .collect();

        log::debug!(
            "IMF transients for '{}' ({} s windows): {} flagged samples",
            run,
            window.num_seconds(),
            count_flags(&flags)
        );
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_speed_from_run_identifier() {
        assert_eq!(SolarWindSpeed::from_run("stretched_LOWnHIGHu").unwrap(), SolarWindSpeed::High);
        assert_eq!(SolarWindSpeed::from_run("stretched_HIGHnMEDu").unwrap(), SolarWindSpeed::Medium);
        assert_eq!(
            SolarWindSpeed::from_run("stretched_LOWnLOWucontinued").unwrap(),
            SolarWindSpeed::Low
        );

        assert!(matches!(
            SolarWindSpeed::from_run("stretched_baseline"),
            Err(EventError::Configuration(_))
        ));
        assert!(SolarWindSpeed::from_run("stretched_LOWnFASTu").is_err());
        assert!(SolarWindSpeed::from_run("continued_run").is_err());
    }

    #[test]
    fn test_speed_from_run_with_suffix_token() {
        assert_eq!(
            SolarWindSpeed::from_run("stretched_LOWnLOWu_continued").unwrap(),
            SolarWindSpeed::Low
        );
        assert_eq!(
            SolarWindSpeed::from_run("stretched_HIGHnMEDu_continued").unwrap(),
            SolarWindSpeed::Medium
        );
    }

    #[test]
    fn test_window_length() {
        let det = TransientDetector::new(TransientParams::default()).unwrap();
        // 182 Re * 6371 km / 800 km/s = 1449.4 s
        let high = det.window(SolarWindSpeed::High).num_milliseconds();
        assert!((high - 1_449_402).abs() <= 1);
        assert_eq!(det.window(SolarWindSpeed::Low).num_seconds(), 2898);
    }

    #[test]
    fn test_flags_inside_windows_only() {
        let t0 = Utc.with_ymd_and_hms(2022, 6, 6, 0, 10, 0).unwrap();
        let geometry = IntervalGeometry::from_minutes(t0, 120, 120).unwrap();
        let times: Vec<Timestamp> = (0..300).map(|i| t0 + Duration::minutes(i)).collect();

        let det = TransientDetector::new(TransientParams::default()).unwrap();
        let flags = det.detect(&times, "stretched_MEDnHIGHu", &geometry).unwrap();

        // Window of ~24.2 minutes: samples 1..=24 after each switch
        assert!(!flags[0]);
        assert!(flags[1] && flags[24]);
        assert!(!flags[25]);
        assert!(!flags[120]);
        assert!(flags[121] && flags[144]);
        assert!(!flags[145]);
        assert_eq!(count_flags(&flags), 24 * 3);
    }

    #[test]
    fn test_fixed_window_ignores_run_identifier() {
        let t0 = Utc.with_ymd_and_hms(2022, 6, 6, 0, 10, 0).unwrap();
        let geometry = IntervalGeometry::from_minutes(t0, 120, 120).unwrap();
        let times: Vec<Timestamp> = (0..300).map(|i| t0 + Duration::minutes(i)).collect();

        let params = TransientParams {
            fixed_window_minutes: Some(30),
            ..TransientParams::default()
        };
        let det = TransientDetector::new(params).unwrap();
        let flags = det.detect(&times, "ideal_baseline", &geometry).unwrap();

        // Samples 1..=29 after each switch
        assert!(flags[1] && flags[29]);
        assert!(!flags[30]);
        assert!(flags[121] && flags[149]);
        assert_eq!(count_flags(&flags), 29 * 3);

        let bad = TransientParams {
            fixed_window_minutes: Some(0),
            ..TransientParams::default()
        };
        assert!(matches!(TransientDetector::new(bad), Err(EventError::Configuration(_))));
    }
}
