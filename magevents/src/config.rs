//! Event detection configuration
//!
//! Everything a detector needs is passed in explicitly through
//! [`EventConfig`]: the interval geometry, the signal names to read and the
//! detector parameters. Two historical parameter sets exist for the
//! parameter study; they are exposed as named [`Preset`]s rather than
//! picking one silently.

use crate::detect::{
    BayParams, Direction, ExtentParams, Threshold, TransientParams, VariabilityParams,
    VariabilityWindow,
};
use crate::interval::IntervalGeometry;
use crate::signals::SignalRef;
use crate::types::{EventError, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named detector parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Steady-driving study: absolute plasmoid drops, 51.4% variability
    #[default]
    Steady,
    /// Ideal-runs study: relative plasmoid drops, 56.24% variability
    Ideals,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Steady => write!(f, "steady"),
            Preset::Ideals => write!(f, "ideals"),
        }
    }
}

impl FromStr for Preset {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "steady" => Ok(Preset::Steady),
            "ideals" => Ok(Preset::Ideals),
            other => Err(EventError::config(format!("unknown preset '{}'", other))),
        }
    }
}

/// Names of the signals each detector reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalNames {
    /// Series whose index the event table shares
    pub reference: SignalRef,
    /// Night-side closed-field volume
    pub plasmoid_volume: SignalRef,
    /// Night-side closed-field mass
    pub plasmoid_mass: SignalRef,
    /// Near-Earth X-line position (tailward negative)
    pub xline: SignalRef,
    /// Night-side closed-field perturbation energy
    pub field_energy: SignalRef,
    /// AL index
    pub al: SignalRef,
    /// Virtual magnetometer grid minimum
    pub mgl: SignalRef,
    /// Open-magnetopause energy flux used for variability
    pub coupling: SignalRef,
}

impl SignalNames {
    /// Signal names of a preset
    pub fn preset(preset: Preset) -> Self {
        let mass = match preset {
            Preset::Steady => "M_night [kg]",
            Preset::Ideals => "M [kg]",
        };
        Self {
            reference: SignalRef::column("mp", "X_NEXL [Re]"),
            plasmoid_volume: SignalRef::column("closed", "Volume [Re^3]"),
            plasmoid_mass: SignalRef::column("closed", mass),
            xline: SignalRef::column("mp", "X_NEXL [Re]"),
            field_energy: SignalRef::column("closed", "u_db_night [J]"),
            al: SignalRef::column("index", "AL"),
            mgl: SignalRef::column("maggrid", "dBmin"),
            coupling: SignalRef::scalar("K1"),
        }
    }

    /// Every name, in the order the composite builder resolves them
    pub fn all(&self) -> [&SignalRef; 8] {
        [
            &self.reference,
            &self.plasmoid_volume,
            &self.plasmoid_mass,
            &self.xline,
            &self.field_energy,
            &self.al,
            &self.mgl,
            &self.coupling,
        ]
    }
}

impl Default for SignalNames {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

/// Parameters of every detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Primary variability window (reported as `K1var`)
    pub variability: VariabilityParams,
    /// Extra windows reported as `K1var_{b}R{a}` and `K1var_{b}-{a}`;
    /// the primary window is already reported as `K1var`
    #[serde(default)]
    pub variability_windows: Vec<VariabilityWindow>,
    pub plasmoid_volume: ExtentParams,
    pub plasmoid_mass: ExtentParams,
    pub dip_xline: ExtentParams,
    pub dip_energy: ExtentParams,
    #[serde(default)]
    pub ground_bay: BayParams,
    #[serde(default)]
    pub transient: TransientParams,
}

impl DetectorParams {
    /// Detector parameters of a preset
    pub fn preset(preset: Preset) -> Self {
        let (threshold, volume, mass, transient_minutes) = match preset {
            Preset::Steady => (51.4, Threshold::Absolute(5.0), Threshold::Absolute(12e3), None),
            Preset::Ideals => (56.24, Threshold::Relative(15.0), Threshold::Relative(10.0), Some(30)),
        };
        Self {
            variability: VariabilityParams::new(threshold),
            variability_windows: vec![
                VariabilityWindow::new(10, 10),
                VariabilityWindow::new(60, 60),
            ],
            plasmoid_volume: ExtentParams::new(Direction::Decrease, volume),
            plasmoid_mass: ExtentParams::new(Direction::Decrease, mass),
            dip_xline: ExtentParams::new(Direction::Increase, Threshold::Relative(15.0)),
            dip_energy: ExtentParams::new(Direction::Decrease, Threshold::Absolute(0.3e15)),
            ground_bay: BayParams::default(),
            transient: TransientParams {
                fixed_window_minutes: transient_minutes,
                ..TransientParams::default()
            },
        }
    }

    /// Validate every detector's parameters
    pub fn validate(&self) -> Result<()> {
        self.variability.validate()?;
        for window in &self.variability_windows {
            VariabilityParams {
                lookbehind: window.lookbehind,
                lookahead: window.lookahead,
                ..self.variability
            }
            .validate()?;
        }
        self.plasmoid_volume.validate()?;
        self.plasmoid_mass.validate()?;
        self.dip_xline.validate()?;
        self.dip_energy.validate()?;
        self.ground_bay.validate()?;
        Ok(())
    }
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

/// Interval aggregation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationParams {
    /// Composite group sampled at the interval start instead of averaged
    pub solar_wind_group: Option<String>,
    /// Scalar watched for total-variation outliers
    pub outlier_signal: Option<String>,
    /// Outlier when total variation exceeds this multiple of `mean(|S|)`
    pub outlier_ratio: f64,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            solar_wind_group: Some("sw".to_string()),
            outlier_signal: Some("K1".to_string()),
            outlier_ratio: 3000.0,
        }
    }
}

/// Complete configuration for one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct EventConfig {
    /// Interval geometry (reference start, length, stride)
    pub geometry: IntervalGeometry,
    /// Simulation epoch the solar-wind input is aligned to
    pub epoch: Timestamp,
    /// Preset the signals and detectors were initialised from
    pub preset: Preset,
    pub signals: SignalNames,
    pub detectors: DetectorParams,
    pub aggregation: AggregationParams,
}

impl EventConfig {
    /// Create a configuration with the default preset; the epoch defaults
    /// to the geometry's reference start
    pub fn new(geometry: IntervalGeometry) -> Self {
        Self {
            geometry,
            epoch: geometry.start(),
            preset: Preset::default(),
            signals: SignalNames::default(),
            detectors: DetectorParams::default(),
            aggregation: AggregationParams::default(),
        }
    }

    /// Builder method: reset signals and detectors to a preset
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self.signals = SignalNames::preset(preset);
        self.detectors = DetectorParams::preset(preset);
        self
    }

    /// Builder method: set the simulation epoch
    pub fn with_epoch(mut self, epoch: Timestamp) -> Self {
        self.epoch = epoch;
        self
    }

    /// Builder method: override signal names
    pub fn with_signals(mut self, signals: SignalNames) -> Self {
        self.signals = signals;
        self
    }

    /// Builder method: override detector parameters
    pub fn with_detectors(mut self, detectors: DetectorParams) -> Self {
        self.detectors = detectors;
        self
    }

    /// Builder method: override aggregation options
    pub fn with_aggregation(mut self, aggregation: AggregationParams) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.detectors.validate()?;
        if !(self.aggregation.outlier_ratio > 0.0) {
            return Err(EventError::config(format!(
                "outlier ratio must be positive, got {}",
                self.aggregation.outlier_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn geometry() -> IntervalGeometry {
        let start = Utc.with_ymd_and_hms(2022, 6, 6, 0, 10, 0).unwrap();
        IntervalGeometry::from_minutes(start, 120, 120).unwrap()
    }

    #[test]
    fn test_presets_differ_where_expected() {
        let steady = EventConfig::new(geometry());
        let ideals = EventConfig::new(geometry()).with_preset(Preset::Ideals);

        assert_eq!(steady.preset, Preset::Steady);
        assert_eq!(steady.detectors.variability.threshold, 51.4);
        assert_eq!(ideals.detectors.variability.threshold, 56.24);
        assert_eq!(steady.detectors.plasmoid_mass.threshold, Threshold::Absolute(12e3));
        assert_eq!(ideals.detectors.plasmoid_mass.threshold, Threshold::Relative(10.0));
        assert_eq!(ideals.signals.plasmoid_mass.to_string(), "closed/M [kg]");
        assert_eq!(steady.detectors.dip_energy, ideals.detectors.dip_energy);
        assert_eq!(steady.detectors.transient.fixed_window_minutes, None);
        assert_eq!(ideals.detectors.transient.fixed_window_minutes, Some(30));

        assert!(steady.validate().is_ok());
        assert!(ideals.validate().is_ok());
    }

    #[test]
    fn test_extra_windows_skip_primary_window() {
        let detectors = DetectorParams::default();
        let primary = &detectors.variability;
        assert!(detectors
            .variability_windows
            .iter()
            .all(|w| (w.lookbehind, w.lookahead) != (primary.lookbehind, primary.lookahead)));
        assert_eq!(
            detectors.variability_windows,
            vec![VariabilityWindow::new(10, 10), VariabilityWindow::new(60, 60)]
        );
    }

    #[test]
    fn test_epoch_defaults_to_reference_start() {
        let config = EventConfig::new(geometry());
        assert_eq!(config.epoch, geometry().start());

        let epoch = Utc.with_ymd_and_hms(2022, 6, 6, 0, 0, 0).unwrap();
        assert_eq!(config.with_epoch(epoch).epoch, epoch);
    }

    #[test]
    fn test_validation_rejects_degenerate_thresholds() {
        let mut detectors = DetectorParams::default();
        detectors.dip_xline.threshold = Threshold::Relative(-1.0);
        let config = EventConfig::new(geometry()).with_detectors(detectors);
        assert!(matches!(config.validate(), Err(EventError::Configuration(_))));
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("Steady".parse::<Preset>().unwrap(), Preset::Steady);
        assert_eq!("ideals".parse::<Preset>().unwrap(), Preset::Ideals);
        assert!("paper".parse::<Preset>().is_err());
    }

    #[test]
    fn test_detector_params_deserialization() {
        let json = r#"{
            "variability": { "threshold": 40.0 },
            "plasmoid_volume": { "direction": "decrease", "threshold": { "absolute": 5.0 } },
            "plasmoid_mass": { "direction": "decrease", "threshold": { "relative": 10.0 } },
            "dip_xline": { "direction": "increase", "threshold": { "relative": 15.0 } },
            "dip_energy": { "direction": "decrease", "lookahead": 12, "search_offset": 2,
                            "threshold": { "absolute": 3e14 } }
        }"#;
        let params: DetectorParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.variability.lookbehind, 5);
        assert_eq!(params.plasmoid_volume.lookahead, 10);
        assert_eq!(params.dip_energy.lookahead, 12);
        assert_eq!(params.dip_energy.search_offset, 2);
        assert_eq!(params.ground_bay, BayParams::default());
        assert!(params.variability_windows.is_empty());
        assert!(params.validate().is_ok());
    }
}
