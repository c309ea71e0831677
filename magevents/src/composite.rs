//! Composite event table builder
//!
//! Runs every detector on a run's signals and merges the results into one
//! [`EventTable`]. All inputs are resolved and all detectors run before any
//! composite column is formed; the first failure aborts the run so a table
//! is either complete or not produced at all.
//!
//! The composite flags were historically computed arithmetically from 0/1
//! columns (ceiling/floor of an average). The builder uses boolean
//! combinators; the arithmetic forms are kept as `arithmetic_*` helpers for
//! consumers that depend on the literal numeric encoding.

use crate::config::EventConfig;
use crate::detect::{
    ExtentGrowingDetector, GroundBayDetector, TransientDetector, VariabilityDetector,
    VariabilityParams,
};
use crate::signals::{Run, Signal};
use crate::table::EventTable;
use crate::types::{count_flags, EventError, Flags, Result};

/// Per-sample logical OR of equally long flag vectors
pub fn any_of(inputs: &[&[bool]]) -> Flags {
    (0..common_len(inputs))
        .map(|i| inputs.iter().any(|flags| flags[i]))
        .collect()
}

/// Per-sample logical AND of equally long flag vectors
pub fn all_of(inputs: &[&[bool]]) -> Flags {
    (0..common_len(inputs))
        .map(|i| inputs.iter().all(|flags| flags[i]))
        .collect()
}

fn common_len(inputs: &[&[bool]]) -> usize {
    inputs.iter().map(|flags| flags.len()).min().unwrap_or(0)
}

/// Samples outside IMF transients, plus any sample with a substorm flag
///
/// Equivalent to `ceil((1 + substorm - imf_transients) / 2)`; in particular
/// a sample with neither flag is clean.
pub fn clean_flags(substorm: &[bool], imf_transients: &[bool]) -> Flags {
    substorm
        .iter()
        .zip(imf_transients)
        .map(|(s, t)| *s || !*t)
        .collect()
}

/// `ceil((DIPb + plasmoids_mass + MGLbays) / 3)` on 0/1 inputs
pub fn arithmetic_substorm(dipb: f64, plasmoids_mass: f64, mgl_bays: f64) -> f64 {
    ((dipb + plasmoids_mass + mgl_bays) / 3.0).ceil()
}

/// `floor((DIPb + plasmoids_mass + MGLbays) / 3)` on 0/1 inputs
pub fn arithmetic_allsubstorm(dipb: f64, plasmoids_mass: f64, mgl_bays: f64) -> f64 {
    ((dipb + plasmoids_mass + mgl_bays) / 3.0).floor()
}

/// `ceil((1 + substorm - imf_transients) / 2)` on 0/1 inputs
pub fn arithmetic_clean(substorm: f64, imf_transients: f64) -> f64 {
    ((1.0 + substorm - imf_transients) / 2.0).ceil()
}

/// Builds the event table of a run
pub struct CompositeEventBuilder<'a> {
    config: &'a EventConfig,
}

impl<'a> CompositeEventBuilder<'a> {
    /// Create a builder, validating the configuration
    pub fn new(config: &'a EventConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run every detector and assemble the event table
    pub fn build(&self, run: &Run) -> Result<EventTable> {
        let names = &self.config.signals;
        let params = &self.config.detectors;
        let set = &run.signals;

        // Resolve all inputs before running anything
        let reference = set.get(&names.reference)?;
        let volume = set.get(&names.plasmoid_volume)?;
        let mass = set.get(&names.plasmoid_mass)?;
        let xline = set.get(&names.xline)?;
        let energy = set.get(&names.field_energy)?;
        let al = set.get(&names.al)?;
        let mgl = set.get(&names.mgl)?;
        let coupling = set.get(&names.coupling)?;
        for signal in [volume, mass, xline, energy, al, mgl, coupling] {
            check_aligned(reference, signal)?;
        }

        log::info!("Building event table for run '{}' ({} samples)", run.name, reference.len());

        let imf_transients = TransientDetector::new(params.transient)?.detect(
            reference.index(),
            &run.name,
            &self.config.geometry,
        )?;

        let dip_x = ExtentGrowingDetector::new(params.dip_xline)?.detect(xline)?;
        let dip_b = ExtentGrowingDetector::new(params.dip_energy)?.detect(energy)?;
        let plasmoids_volume = ExtentGrowingDetector::new(params.plasmoid_volume)?.detect(volume)?;
        let plasmoids_mass = ExtentGrowingDetector::new(params.plasmoid_mass)?.detect(mass)?;

        let bay_detector = GroundBayDetector::new(params.ground_bay)?;
        let al_bays = bay_detector.detect(al)?;
        let mgl_bays = bay_detector.detect(mgl)?;

        let primary = VariabilityDetector::new(params.variability)?.detect(coupling, true)?;
        let mut windowed = Vec::with_capacity(params.variability_windows.len() * 2);
        let mut unsteady = primary.unsteady.clone();
        let mut integral_error = primary.integral_error.clone();
        for window in &params.variability_windows {
            let detector = VariabilityDetector::new(VariabilityParams {
                lookbehind: window.lookbehind,
                lookahead: window.lookahead,
                ..params.variability
            })?;
            let relative = detector.detect(coupling, true)?;
            let absolute = detector.detect(coupling, false)?;
            let prefix = coupling.name();
            let primary_window = window.lookbehind == params.variability.lookbehind
                && window.lookahead == params.variability.lookahead;
            // The primary window's relative metric is already `K1var`
            if !primary_window {
                windowed.push((
                    format!("{}var_{}R{}", prefix, window.lookbehind, window.lookahead),
                    relative.metric,
                ));
            }
            windowed.push((
                format!("{}var_{}-{}", prefix, window.lookbehind, window.lookahead),
                absolute.metric,
            ));
            // The last configured window wins
            unsteady = relative.unsteady;
            integral_error = relative.integral_error;
        }

        // Composite rules
        let dip = any_of(&[&dip_x, &dip_b]);
        let plasmoids = any_of(&[&plasmoids_volume, &plasmoids_mass]);
        let substorm = any_of(&[&dip_b, &plasmoids_mass, &mgl_bays.bays]);
        let allsubstorm = all_of(&[&dip_b, &plasmoids_mass, &mgl_bays.bays]);
        let clean = clean_flags(&substorm, &imf_transients);

        let mut table = EventTable::new(run.name.clone(), reference.index().to_vec());
        table.push_flags("imf_transients", imf_transients)?;
        table.push_flags("DIPx", dip_x)?;
        table.push_flags("DIPb", dip_b)?;
        table.push_flags("DIP", dip)?;
        table.push_flags("plasmoids_volume", plasmoids_volume)?;
        table.push_flags("plasmoids_mass", plasmoids_mass)?;
        table.push_flags("plasmoids", plasmoids)?;
        table.push_flags("ALbays", al_bays.bays)?;
        table.push_flags("ALonsets", al_bays.onsets)?;
        table.push_flags("ALpseudos", al_bays.pseudos)?;
        table.push_flags("MGLbays", mgl_bays.bays)?;
        table.push_flags("MGLonsets", mgl_bays.onsets)?;
        table.push_flags("MGLpseudos", mgl_bays.pseudos)?;
        table.push_flags("substorm", substorm)?;
        table.push_flags("allsubstorm", allsubstorm)?;
        table.push_metric(format!("{}var", coupling.name()), primary.metric)?;
        for (name, values) in windowed {
            table.push_metric(name, values)?;
        }
        table.push_flags(format!("{}unsteady", coupling.name()), unsteady)?;
        table.push_metric(format!("{}err", coupling.name()), integral_error)?;
        table.push_flags("clean", clean)?;

        log::info!(
            "Run '{}': {} substorm samples, {} clean samples",
            run.name,
            table.flags("substorm").map(count_flags).unwrap_or(0),
            table.flags("clean").map(count_flags).unwrap_or(0)
        );
        Ok(table)
    }
}

/// Build the event table of a run with the given configuration
pub fn build_events(run: &Run, config: &EventConfig) -> Result<EventTable> {
    CompositeEventBuilder::new(config)?.build(run)
}

fn check_aligned(reference: &Signal, signal: &Signal) -> Result<()> {
    if signal.index() != reference.index() {
        return Err(EventError::shape(format!(
            "signal '{}' ({} samples) does not share the index of reference '{}' ({} samples)",
            signal.name(),
            signal.len(),
            reference.name(),
            reference.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: [bool; 2] = [false, true];

    fn as_f64(flag: bool) -> f64 {
        if flag {
            1.0
        } else {
            0.0
        }
    }

    #[test]
    fn test_substorm_arithmetic_matches_combinators() {
        for a in BOTH {
            for b in BOTH {
                for c in BOTH {
                    let any = any_of(&[&[a], &[b], &[c]])[0];
                    let all = all_of(&[&[a], &[b], &[c]])[0];
                    assert_eq!(as_f64(any), arithmetic_substorm(as_f64(a), as_f64(b), as_f64(c)));
                    assert_eq!(as_f64(all), arithmetic_allsubstorm(as_f64(a), as_f64(b), as_f64(c)));
                }
            }
        }
    }

    #[test]
    fn test_clean_arithmetic_matches_combinator() {
        for substorm in BOTH {
            for imf in BOTH {
                let clean = clean_flags(&[substorm], &[imf])[0];
                assert_eq!(as_f64(clean), arithmetic_clean(as_f64(substorm), as_f64(imf)));
            }
        }
        // Neither flag set: clean
        assert_eq!(arithmetic_clean(0.0, 0.0), 1.0);
        assert_eq!(clean_flags(&[false], &[true]), vec![false]);
    }

    #[test]
    fn test_combinators_per_sample() {
        let a = [true, false, false, true];
        let b = [false, false, true, true];
        assert_eq!(any_of(&[&a, &b]), vec![true, false, true, true]);
        assert_eq!(all_of(&[&a, &b]), vec![false, false, false, true]);
        assert!(any_of(&[]).is_empty());
    }
}
