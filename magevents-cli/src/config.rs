//! Configuration loading and parsing

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use magevents::detect::{BayParams, ExtentParams, TransientParams};
use magevents::{AggregationParams, EventConfig, IntervalGeometry, Preset, SignalRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from analysis.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub detectors: DetectorsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// JSON run files, processed in this order
    #[serde(default)]
    pub runs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// First interval start, RFC 3339 (e.g. "2022-06-06T00:10:00Z")
    pub reference_start: DateTime<Utc>,
    /// Simulation epoch; defaults to `reference_start`
    pub epoch: Option<DateTime<Utc>>,
    #[serde(default = "default_minutes")]
    pub interval_minutes: i64,
    #[serde(default = "default_minutes")]
    pub stride_minutes: i64,
    /// Series whose index the event table shares
    pub reference_signal: Option<SignalRef>,
    pub solar_wind_group: Option<String>,
    pub outlier_signal: Option<String>,
    pub outlier_ratio: Option<f64>,
    pub correlation: Option<CorrelationConfig>,
}

fn default_minutes() -> i64 {
    120
}

/// Cross-correlation of two series per interval. Each series is divided
/// by its factor first, so `yfactor = 1e12` correlates K1 in TW.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrelationConfig {
    pub x: SignalRef,
    pub y: SignalRef,
    /// Divisor applied to `x`
    #[serde(default = "default_factor")]
    pub xfactor: f64,
    /// Divisor applied to `y`
    #[serde(default = "default_factor")]
    pub yfactor: f64,
}

fn default_factor() -> f64 {
    1.0
}

/// Preset selection plus optional per-detector overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DetectorsConfig {
    #[serde(default)]
    pub preset: Preset,
    pub variability_threshold: Option<f64>,
    pub plasmoid_volume: Option<ExtentParams>,
    pub plasmoid_mass: Option<ExtentParams>,
    pub dip_xline: Option<ExtentParams>,
    pub dip_energy: Option<ExtentParams>,
    pub ground_bay: Option<BayParams>,
    pub transient: Option<TransientParams>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Directory for per-run reports (default: stdout)
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl AppConfig {
    /// Build and validate the library configuration
    pub fn event_config(&self) -> Result<EventConfig> {
        let analysis = &self.analysis;
        let geometry = IntervalGeometry::from_minutes(
            analysis.reference_start,
            analysis.interval_minutes,
            analysis.stride_minutes,
        )
        .context("Invalid interval geometry")?;

        let mut config = EventConfig::new(geometry).with_preset(self.detectors.preset);
        if let Some(epoch) = analysis.epoch {
            config = config.with_epoch(epoch);
        }
        if let Some(reference) = &analysis.reference_signal {
            config.signals.reference = reference.clone();
        }

        let mut aggregation = AggregationParams::default();
        if let Some(group) = &analysis.solar_wind_group {
            aggregation.solar_wind_group = Some(group.clone());
        }
        if let Some(signal) = &analysis.outlier_signal {
            aggregation.outlier_signal = Some(signal.clone());
        }
        if let Some(ratio) = analysis.outlier_ratio {
            aggregation.outlier_ratio = ratio;
        }
        config = config.with_aggregation(aggregation);

        let overrides = &self.detectors;
        let detectors = &mut config.detectors;
        if let Some(threshold) = overrides.variability_threshold {
            detectors.variability.threshold = threshold;
        }
        if let Some(params) = overrides.plasmoid_volume {
            detectors.plasmoid_volume = params;
        }
        if let Some(params) = overrides.plasmoid_mass {
            detectors.plasmoid_mass = params;
        }
        if let Some(params) = overrides.dip_xline {
            detectors.dip_xline = params;
        }
        if let Some(params) = overrides.dip_energy {
            detectors.dip_energy = params;
        }
        if let Some(params) = overrides.ground_bay {
            detectors.ground_bay = params;
        }
        if let Some(params) = overrides.transient {
            detectors.transient = params;
        }

        config.validate().context("Invalid detector configuration")?;
        Ok(config)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use magevents::Threshold;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [analysis]
        reference_start = "2022-06-06T00:10:00Z"
    "#;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            runs = ["runs/stretched_LOWnHIGHu.json", "runs/stretched_HIGHnLOWu.json"]

            [analysis]
            reference_start = "2022-06-06T00:10:00Z"
            epoch = "2022-06-06T00:00:00Z"
            interval_minutes = 60
            stride_minutes = 30
            reference_signal = "mp/X_NEXL [Re]"
            correlation = { x = "K1", y = "index/AL", yfactor = -1.0 }

            [detectors]
            preset = "ideals"
            variability_threshold = 40.0

            [detectors.dip_energy]
            direction = "decrease"
            threshold = { absolute = 2e14 }

            [output]
            format = "json"
            output_dir = "out"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.runs.len(), 2);
        assert_eq!(config.detectors.preset, Preset::Ideals);
        assert_eq!(config.output.format, OutputFormat::Json);

        let correlation = config.analysis.correlation.as_ref().unwrap();
        assert_eq!(correlation.y.to_string(), "index/AL");
        assert_eq!(correlation.xfactor, 1.0);
        assert_eq!(correlation.yfactor, -1.0);

        let event_config = config.event_config().unwrap();
        assert_eq!(event_config.geometry.stride(), chrono::Duration::minutes(30));
        assert_eq!(event_config.detectors.variability.threshold, 40.0);
        assert_eq!(
            event_config.detectors.dip_energy.threshold,
            Threshold::Absolute(2e14)
        );
        assert_eq!(event_config.detectors.dip_energy.lookahead, 10);
        // Untouched detectors keep the preset values
        assert_eq!(
            event_config.detectors.plasmoid_mass.threshold,
            Threshold::Relative(10.0)
        );
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert!(config.input.runs.is_empty());
        assert_eq!(config.analysis.interval_minutes, 120);
        assert_eq!(config.output.format, OutputFormat::Txt);

        let event_config = config.event_config().unwrap();
        assert_eq!(event_config.preset, Preset::Steady);
        assert_eq!(event_config.epoch, config.analysis.reference_start);
        assert_eq!(event_config.aggregation.outlier_ratio, 3000.0);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let toml_content = r#"
            [analysis]
            reference_start = "2022-06-06T00:10:00Z"
            stride_minutes = 0
        "#;
        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert!(config.event_config().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analysis.stride_minutes, 120);
    }

    #[test]
    fn test_load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.toml"));
    }
}
