//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during calibration and solving
//! - exported to JSON/CSV
//! - reloaded later for comparisons across runs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::QuantError;
use crate::physics;

/// One quantified element and the X-ray line its intensities were integrated on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementLine {
    /// Chemical symbol, e.g. `"Ga"`.
    pub symbol: String,
    /// Line label, e.g. `"Ga_Ka"`. Also the CSV column name for this element.
    pub line: String,
}

impl ElementLine {
    pub fn new(symbol: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            line: line.into(),
        }
    }

    /// The K-alpha line is the default choice for every element we quantify.
    pub fn with_default_line(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let line = format!("{symbol}_Ka");
        Self { symbol, line }
    }
}

/// The fixed ternary element set, ordered alphabetically by line label.
///
/// Every per-element array in the pipeline is indexed by the *slot* an element
/// holds in this set. The mapping is explicit: callers go through
/// [`ElementSet::slot`] rather than assuming any ordering convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSet {
    lines: Vec<ElementLine>,
}

impl ElementSet {
    /// Build the ternary set. Requires exactly three distinct elements.
    pub fn ternary(mut lines: Vec<ElementLine>) -> Result<Self, QuantError> {
        if lines.len() != 3 {
            return Err(QuantError::InputShape {
                context: "element set".to_string(),
                got: lines.len(),
                expected: 3,
            });
        }
        lines.sort_by(|a, b| a.line.cmp(&b.line));
        for (i, a) in lines.iter().enumerate() {
            for b in &lines[i + 1..] {
                if a.symbol == b.symbol || a.line == b.line {
                    return Err(QuantError::InvalidParameter(format!(
                        "duplicate element '{}' in element set",
                        b.symbol
                    )));
                }
            }
        }
        Ok(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[ElementLine] {
        &self.lines
    }

    /// Array slot of an element, by symbol.
    pub fn slot(&self, symbol: &str) -> Result<usize, QuantError> {
        self.lines
            .iter()
            .position(|e| e.symbol == symbol)
            .ok_or_else(|| QuantError::UnknownElement {
                symbol: symbol.to_string(),
                context: "not part of the analysed element set".to_string(),
            })
    }

    /// Atomic masses (g/mol) aligned to slots.
    pub fn atomic_masses(&self) -> Result<Vec<f64>, QuantError> {
        self.lines
            .iter()
            .map(|e| physics::atomic_mass(&e.symbol))
            .collect()
    }

    /// Elemental densities (g/cm3) aligned to slots.
    pub fn densities_g_cm3(&self) -> Result<Vec<f64>, QuantError> {
        self.lines
            .iter()
            .map(|e| physics::density_g_cm3(&e.symbol))
            .collect()
    }
}

/// Half-open pixel range `[start, end)` along the scan axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRange {
    pub start: usize,
    pub end: usize,
}

impl PixelRange {
    pub fn new(start: usize, end: usize) -> Result<Self, QuantError> {
        if end <= start {
            return Err(QuantError::InvalidParameter(format!(
                "pixel range {start}:{end} is empty"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `"a:b"` (half-open, `b > a`).
    pub fn parse(text: &str) -> Result<Self, QuantError> {
        let parse_bound = |s: &str| {
            s.trim().parse::<usize>().map_err(|_| {
                QuantError::InvalidParameter(format!("invalid pixel range '{text}' (want 'a:b')"))
            })
        };
        let (a, b) = text.split_once(':').ok_or_else(|| {
            QuantError::InvalidParameter(format!("invalid pixel range '{text}' (want 'a:b')"))
        })?;
        Self::new(parse_bound(a)?, parse_bound(b)?)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Background-subtracted, integrated X-ray counts per pixel, one profile per
/// element, on a shared scan-position axis.
///
/// Immutable after construction; region selection clones the sub-arrays.
#[derive(Debug, Clone)]
pub struct IntensityProfiles {
    elements: ElementSet,
    positions_nm: Vec<f64>,
    /// Counts indexed `[slot][pixel]`.
    counts: Vec<Vec<f64>>,
}

impl IntensityProfiles {
    pub fn new(
        elements: ElementSet,
        positions_nm: Vec<f64>,
        counts: Vec<Vec<f64>>,
    ) -> Result<Self, QuantError> {
        if counts.len() != elements.len() {
            return Err(QuantError::InputShape {
                context: "intensity profiles (element count)".to_string(),
                got: counts.len(),
                expected: elements.len(),
            });
        }
        for (slot, profile) in counts.iter().enumerate() {
            if profile.len() != positions_nm.len() {
                return Err(QuantError::InputShape {
                    context: format!(
                        "intensity profile for {}",
                        elements.lines()[slot].line
                    ),
                    got: profile.len(),
                    expected: positions_nm.len(),
                });
            }
        }
        Ok(Self {
            elements,
            positions_nm,
            counts,
        })
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn n_pixels(&self) -> usize {
        self.positions_nm.len()
    }

    pub fn positions_nm(&self) -> &[f64] {
        &self.positions_nm
    }

    pub fn counts(&self, slot: usize) -> &[f64] {
        &self.counts[slot]
    }

    /// Select a sub-region by pixel range (the region-selection seam of the
    /// spectral-processing collaborator).
    pub fn select(&self, range: PixelRange) -> Result<IntensityProfiles, QuantError> {
        if range.end > self.n_pixels() {
            return Err(QuantError::InputShape {
                context: format!("pixel range {}:{}", range.start, range.end),
                got: range.end,
                expected: self.n_pixels(),
            });
        }
        Ok(IntensityProfiles {
            elements: self.elements.clone(),
            positions_nm: self.positions_nm[range.start..range.end].to_vec(),
            counts: self
                .counts
                .iter()
                .map(|c| c[range.start..range.end].to_vec())
                .collect(),
        })
    }

    /// Total counts per slot over all pixels.
    pub fn totals(&self) -> Vec<f64> {
        self.counts.iter().map(|c| c.iter().sum()).collect()
    }
}

/// Which element plays which part in the calibration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// The two elements whose zeta-factors come from the reference region.
    pub reference: [String; 2],
    /// The reference element whose atomic fraction is spatially constant
    /// across the region of interest (the search's flatness prior).
    pub constant: String,
    /// The element with no reference region, whose zeta-factor is solved for.
    pub unknown: String,
}

impl RoleSpec {
    pub fn validate(&self, elements: &ElementSet) -> Result<(), QuantError> {
        for symbol in self.reference.iter().chain([&self.constant, &self.unknown]) {
            elements.slot(symbol)?;
        }
        if !self.reference.contains(&self.constant) {
            return Err(QuantError::InvalidParameter(format!(
                "constant element '{}' must be one of the reference elements",
                self.constant
            )));
        }
        if self.reference.contains(&self.unknown) {
            return Err(QuantError::InvalidParameter(format!(
                "unknown element '{}' cannot also be a reference element",
                self.unknown
            )));
        }
        if self.reference[0] == self.reference[1] {
            return Err(QuantError::InvalidParameter(
                "the two reference elements must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Beam parameters that determine the electron dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionParams {
    /// Probe current in nanoamperes.
    pub probe_current_na: f64,
    /// Live time per pixel in seconds.
    pub live_time_s: f64,
}

impl AcquisitionParams {
    pub fn validate(&self) -> Result<(), QuantError> {
        if !(self.probe_current_na.is_finite() && self.probe_current_na > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "probe current must be positive, got {} nA",
                self.probe_current_na
            )));
        }
        if !(self.live_time_s.is_finite() && self.live_time_s > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "live time must be positive, got {} s",
                self.live_time_s
            )));
        }
        Ok(())
    }

    /// Electrons deposited per pixel.
    pub fn dose_per_pixel(&self) -> f64 {
        self.probe_current_na * 1e-9 * self.live_time_s / physics::ELEMENTARY_CHARGE_C
    }

    /// Electrons deposited over `n_pixels` pixels.
    pub fn total_dose(&self, n_pixels: usize) -> f64 {
        self.dose_per_pixel() * n_pixels as f64
    }
}

/// The reference region: known fixed composition, known density and thickness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    /// Pixel range of the reference region within the full scan.
    pub range: PixelRange,
    /// Known weight fractions of the two reference elements, summing to 1.
    pub weight_fractions: Vec<(String, f64)>,
    /// Density of the reference material (g/cm3).
    pub density_g_cm3: f64,
    /// Physical thickness of the reference region (nm).
    pub thickness_nm: f64,
}

impl ReferenceSpec {
    pub fn validate(&self, roles: &RoleSpec) -> Result<(), QuantError> {
        if self.weight_fractions.len() != 2 {
            return Err(QuantError::InputShape {
                context: "reference weight fractions".to_string(),
                got: self.weight_fractions.len(),
                expected: 2,
            });
        }
        for (symbol, w) in &self.weight_fractions {
            if !roles.reference.contains(symbol) {
                return Err(QuantError::InvalidParameter(format!(
                    "reference composition names '{symbol}', which is not a reference element"
                )));
            }
            if !(w.is_finite() && *w > 0.0 && *w < 1.0) {
                return Err(QuantError::InvalidParameter(format!(
                    "reference weight fraction for '{symbol}' must be in (0, 1), got {w}"
                )));
            }
        }
        let sum: f64 = self.weight_fractions.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(QuantError::InvalidParameter(format!(
                "reference weight fractions must sum to 1, got {sum}"
            )));
        }
        if !(self.density_g_cm3.is_finite() && self.density_g_cm3 > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "reference density must be positive, got {} g/cm3",
                self.density_g_cm3
            )));
        }
        if !(self.thickness_nm.is_finite() && self.thickness_nm > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "reference thickness must be positive, got {} nm",
                self.thickness_nm
            )));
        }
        Ok(())
    }

    /// Mass-thickness (kg/m2) of the reference region.
    pub fn mass_thickness_kg_m2(&self) -> f64 {
        // g/cm3 -> kg/m3 is *1e3; nm -> m is *1e-9.
        self.density_g_cm3 * 1e3 * self.thickness_nm * 1e-9
    }
}

/// Control parameters for the unknown-zeta search.
///
/// `ceiling_ratio` and `tolerance_step` are tunable heuristics, not physically
/// derived constants; the defaults reproduce the established procedure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Escalate once the trial zeta exceeds this multiple of the constant
    /// element's zeta-factor.
    pub ceiling_ratio: f64,
    /// Flatness tolerance increment applied at each escalation.
    pub tolerance_step: f64,
    /// Starting flatness tolerance.
    pub initial_tolerance: f64,
    /// Hard bound on search iterations; exceeding it is a NonConvergence error.
    pub max_iterations: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            ceiling_ratio: 10.0,
            tolerance_step: 0.001,
            initial_tolerance: 0.0,
            max_iterations: 2_000_000,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), QuantError> {
        if !(self.ceiling_ratio.is_finite() && self.ceiling_ratio > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "ceiling ratio must be positive, got {}",
                self.ceiling_ratio
            )));
        }
        if !(self.tolerance_step.is_finite() && self.tolerance_step > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "tolerance step must be positive, got {}",
                self.tolerance_step
            )));
        }
        if !(self.initial_tolerance.is_finite() && self.initial_tolerance >= 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "initial tolerance must be non-negative, got {}",
                self.initial_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(QuantError::InvalidParameter(
                "max iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a zeta-factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZetaSource {
    /// Computed in closed form from the reference region.
    Reference,
    /// Solved by the flatness search.
    Solved,
}

/// A calibrated zeta-factor for one element/line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZetaEntry {
    pub symbol: String,
    pub line: String,
    pub zeta: f64,
    pub source: ZetaSource,
}

/// One escalation of the flatness tolerance during the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    /// Iteration (0-based) at which the ceiling was crossed.
    pub iteration: usize,
    /// Trial zeta that crossed the ceiling.
    pub ceiling_trial: u64,
    /// Tolerance in force after the escalation.
    pub new_tolerance: f64,
}

/// Result of the unknown-zeta search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Solved zeta-factor for the unknown element.
    pub zeta: f64,
    /// Flatness tolerance in force at acceptance. A larger value means the
    /// acceptance band had to be widened and the fit is worse conditioned.
    pub tolerance: f64,
    /// Achieved spread (max - min atomic fraction) of the constant element.
    pub spread: f64,
    /// Number of trial evaluations performed.
    pub iterations: usize,
    /// Every tolerance escalation, in order.
    pub escalations: Vec<Escalation>,
}

/// Full zeta calibration: the per-element vector plus search diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZetaCalibration {
    /// One entry per slot, aligned to the element set.
    pub entries: Vec<ZetaEntry>,
    pub outcome: SearchOutcome,
}

impl ZetaCalibration {
    /// Zeta values aligned to slots.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.zeta).collect()
    }
}

/// Quantified output profiles on the shared scan-position axis.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantProfiles {
    pub elements: ElementSet,
    pub positions_nm: Vec<f64>,
    /// Atomic fractions indexed `[slot][pixel]`; each pixel sums to 1.
    pub atomic_fraction: Vec<Vec<f64>>,
    /// Mass-thickness per pixel (kg/m2).
    pub mass_thickness_kg_m2: Vec<f64>,
    /// Physical thickness per pixel (nm).
    pub thickness_nm: Vec<f64>,
}

/// Per-element summary of an atomic-fraction profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStats {
    pub symbol: String,
    pub at_min: f64,
    pub at_mean: f64,
    pub at_max: f64,
}

/// Summary stats over the quantified region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub n_pixels: usize,
    pub position_min_nm: f64,
    pub position_max_nm: f64,
    pub elements: Vec<ElementStats>,
    pub thickness_min_nm: f64,
    pub thickness_max_nm: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct QuantConfig {
    /// Profile CSV to quantify. `None` for synthetic (demo) runs.
    pub input: Option<PathBuf>,
    pub elements: Vec<ElementLine>,
    pub roles: RoleSpec,
    pub reference: ReferenceSpec,
    /// Region of interest quantified and searched over.
    pub roi: PixelRange,
    pub acquisition: AcquisitionParams,
    pub search: SearchSettings,

    pub export_results: Option<PathBuf>,
    pub export_profile: Option<PathBuf>,
    /// Write a markdown debug bundle describing the run.
    pub debug_bundle: bool,
}

/// A saved quantified-profile file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFile {
    pub tool: String,
    pub elements: Vec<ElementLine>,
    pub roles: RoleSpec,
    pub zetas: Vec<ZetaEntry>,
    pub accepted_tolerance: f64,
    pub spread: f64,
    pub iterations: usize,
    pub positions_nm: Vec<f64>,
    /// Atomic-fraction profiles keyed by element symbol.
    pub atomic_fraction: BTreeMap<String, Vec<f64>>,
    pub mass_thickness_kg_m2: Vec<f64>,
    pub thickness_nm: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn algaas() -> ElementSet {
        ElementSet::ternary(vec![
            ElementLine::with_default_line("Ga"),
            ElementLine::with_default_line("Al"),
            ElementLine::with_default_line("As"),
        ])
        .unwrap()
    }

    #[test]
    fn element_set_orders_by_line_label() {
        let set = algaas();
        let lines: Vec<&str> = set.lines().iter().map(|e| e.line.as_str()).collect();
        assert_eq!(lines, ["Al_Ka", "As_Ka", "Ga_Ka"]);
        assert_eq!(set.slot("Al").unwrap(), 0);
        assert_eq!(set.slot("As").unwrap(), 1);
        assert_eq!(set.slot("Ga").unwrap(), 2);
    }

    #[test]
    fn element_set_rejects_duplicates() {
        let err = ElementSet::ternary(vec![
            ElementLine::with_default_line("Ga"),
            ElementLine::with_default_line("Ga"),
            ElementLine::with_default_line("As"),
        ])
        .unwrap_err();
        assert!(matches!(err, QuantError::InvalidParameter(_)));
    }

    #[test]
    fn pixel_range_parses_and_validates() {
        let r = PixelRange::parse("10:40").unwrap();
        assert_eq!((r.start, r.end, r.len()), (10, 40, 30));
        assert!(PixelRange::parse("40:10").is_err());
        assert!(PixelRange::parse("abc").is_err());
    }

    #[test]
    fn profiles_reject_misaligned_lengths() {
        let set = algaas();
        let err = IntensityProfiles::new(
            set,
            vec![0.0, 1.0, 2.0],
            vec![vec![1.0; 3], vec![1.0; 2], vec![1.0; 3]],
        )
        .unwrap_err();
        assert!(matches!(err, QuantError::InputShape { .. }));
    }

    #[test]
    fn select_clips_to_range() {
        let set = algaas();
        let profiles = IntensityProfiles::new(
            set,
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                vec![1.0, 2.0, 3.0, 4.0],
                vec![5.0, 6.0, 7.0, 8.0],
                vec![9.0, 10.0, 11.0, 12.0],
            ],
        )
        .unwrap();

        let sub = profiles.select(PixelRange::new(1, 3).unwrap()).unwrap();
        assert_eq!(sub.n_pixels(), 2);
        assert_eq!(sub.positions_nm(), &[1.0, 2.0]);
        assert_eq!(sub.counts(0), &[2.0, 3.0]);
        assert_eq!(sub.totals(), vec![5.0, 13.0, 21.0]);

        assert!(profiles.select(PixelRange::new(2, 5).unwrap()).is_err());
    }

    #[test]
    fn role_spec_validation() {
        let set = algaas();
        let good = RoleSpec {
            reference: ["As".to_string(), "Ga".to_string()],
            constant: "As".to_string(),
            unknown: "Al".to_string(),
        };
        assert!(good.validate(&set).is_ok());

        let constant_not_reference = RoleSpec {
            constant: "Al".to_string(),
            ..good.clone()
        };
        assert!(constant_not_reference.validate(&set).is_err());

        let unknown_is_reference = RoleSpec {
            unknown: "Ga".to_string(),
            ..good
        };
        assert!(unknown_is_reference.validate(&set).is_err());
    }

    #[test]
    fn dose_scales_with_pixels() {
        let acq = AcquisitionParams {
            probe_current_na: 0.5,
            live_time_s: 0.01,
        };
        let per_pixel = acq.dose_per_pixel();
        // 0.5 nA * 10 ms = 5e-12 C -> / e = ~3.12e7 electrons.
        assert!((per_pixel - 3.121e7).abs() / 3.121e7 < 1e-3);
        assert!((acq.total_dose(40) - 40.0 * per_pixel).abs() < 1e-3);
    }

    #[test]
    fn reference_mass_thickness_units() {
        let reference = ReferenceSpec {
            range: PixelRange::new(0, 40).unwrap(),
            weight_fractions: vec![("As".to_string(), 0.5), ("Ga".to_string(), 0.5)],
            density_g_cm3: 5.32,
            thickness_nm: 100.0,
        };
        // 5.32 g/cm3 = 5320 kg/m3; 100 nm = 1e-7 m -> 5.32e-4 kg/m2.
        assert!((reference.mass_thickness_kg_m2() - 5.32e-4).abs() < 1e-12);
    }

    #[test]
    fn reference_spec_rejects_bad_composition() {
        let roles = RoleSpec {
            reference: ["As".to_string(), "Ga".to_string()],
            constant: "As".to_string(),
            unknown: "Al".to_string(),
        };
        let mut reference = ReferenceSpec {
            range: PixelRange::new(0, 40).unwrap(),
            weight_fractions: vec![("As".to_string(), 0.5), ("Ga".to_string(), 0.5)],
            density_g_cm3: 5.32,
            thickness_nm: 100.0,
        };
        assert!(reference.validate(&roles).is_ok());

        reference.weight_fractions = vec![("As".to_string(), 0.7), ("Ga".to_string(), 0.5)];
        assert!(reference.validate(&roles).is_err());
    }

    #[test]
    fn search_settings_defaults_are_valid() {
        let settings = SearchSettings::default();
        assert!(settings.validate().is_ok());
        assert!((settings.ceiling_ratio - 10.0).abs() < 1e-12);
        assert!((settings.tolerance_step - 0.001).abs() < 1e-12);
    }
}
