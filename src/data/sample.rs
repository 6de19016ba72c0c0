//! Synthetic line-scan generation from ground-truth zeta-factors.
//!
//! The generator runs the zeta equation forward: given a composition profile,
//! a thickness profile, and per-element zeta-factors, it produces the
//! intensity profiles a detector would have integrated. The scan has two
//! segments:
//!
//! - a reference segment of fixed binary composition (the substrate), where
//!   the unknown element is absent
//! - a region of interest where the unknown element ramps, the constant
//!   element stays at a fixed atomic fraction, and the thickness is a wedge
//!
//! Optional counting noise perturbs each count by a Gaussian scaled to
//! `sqrt(counts)`, seeded deterministically from the spec.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{
    AcquisitionParams, ElementLine, ElementSet, IntensityProfiles, PixelRange, ReferenceSpec,
    RoleSpec,
};
use crate::error::QuantError;
use crate::physics;

/// Everything needed to generate one synthetic scan.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub elements: Vec<ElementLine>,
    pub roles: RoleSpec,
    /// Ground-truth zeta-factors by symbol (all three).
    pub zetas: Vec<(String, f64)>,

    /// Weight fractions of the two reference elements in the reference segment.
    pub reference_weight_fractions: [(String, f64); 2],
    pub n_reference_pixels: usize,
    pub reference_thickness_nm: f64,

    pub n_roi_pixels: usize,
    /// Atomic fraction the constant element holds across the ROI.
    pub constant_at_fraction: f64,
    /// Atomic-fraction ramp of the unknown element across the ROI.
    pub unknown_at_range: (f64, f64),
    /// Thickness wedge across the ROI (nm).
    pub roi_thickness_range_nm: (f64, f64),

    pub pixel_size_nm: f64,
    pub acquisition: AcquisitionParams,
    /// Relative scale of the `sqrt(counts)` Gaussian noise; 0 disables noise.
    pub noise: f64,
    pub seed: u64,
}

impl SampleSpec {
    /// A GaAs substrate with an AlGaAs layer: the canonical demo specimen.
    pub fn algaas_demo(seed: u64, noise: f64) -> Self {
        Self {
            elements: vec![
                ElementLine::with_default_line("Al"),
                ElementLine::with_default_line("As"),
                ElementLine::with_default_line("Ga"),
            ],
            roles: RoleSpec {
                reference: ["As".to_string(), "Ga".to_string()],
                constant: "As".to_string(),
                unknown: "Al".to_string(),
            },
            zetas: vec![
                ("Al".to_string(), 550.0),
                ("As".to_string(), 680.0),
                ("Ga".to_string(), 495.0),
            ],
            reference_weight_fractions: [("As".to_string(), 0.5), ("Ga".to_string(), 0.5)],
            n_reference_pixels: 40,
            reference_thickness_nm: 100.0,
            n_roi_pixels: 160,
            constant_at_fraction: 0.5,
            unknown_at_range: (0.05, 0.40),
            roi_thickness_range_nm: (90.0, 130.0),
            pixel_size_nm: 2.0,
            acquisition: AcquisitionParams {
                probe_current_na: 2.0,
                live_time_s: 0.05,
            },
            noise,
            seed,
        }
    }

    fn validate(&self) -> Result<(), QuantError> {
        if self.n_reference_pixels == 0 || self.n_roi_pixels < 2 {
            return Err(QuantError::InvalidParameter(
                "need at least 1 reference pixel and 2 ROI pixels".to_string(),
            ));
        }
        if !(self.pixel_size_nm.is_finite() && self.pixel_size_nm > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "pixel size must be positive, got {} nm",
                self.pixel_size_nm
            )));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "noise scale must be non-negative, got {}",
                self.noise
            )));
        }
        let (lo, hi) = self.unknown_at_range;
        let x_c = self.constant_at_fraction;
        if !(x_c > 0.0 && x_c < 1.0 && lo > 0.0 && hi > 0.0 && x_c + lo.max(hi) < 1.0) {
            return Err(QuantError::InvalidParameter(
                "ROI composition must keep every element's fraction in (0, 1)".to_string(),
            ));
        }
        for (symbol, zeta) in &self.zetas {
            if !(zeta.is_finite() && *zeta > 0.0) {
                return Err(QuantError::InvalidParameter(format!(
                    "ground-truth zeta for '{symbol}' must be positive, got {zeta}"
                )));
            }
        }
        Ok(())
    }

    fn seed_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        self.n_reference_pixels.hash(&mut hasher);
        self.n_roi_pixels.hash(&mut hasher);
        self.pixel_size_nm.to_bits().hash(&mut hasher);
        self.constant_at_fraction.to_bits().hash(&mut hasher);
        self.unknown_at_range.0.to_bits().hash(&mut hasher);
        self.unknown_at_range.1.to_bits().hash(&mut hasher);
        self.roi_thickness_range_nm.0.to_bits().hash(&mut hasher);
        self.roi_thickness_range_nm.1.to_bits().hash(&mut hasher);
        self.noise.to_bits().hash(&mut hasher);
        for (symbol, zeta) in &self.zetas {
            symbol.hash(&mut hasher);
            zeta.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Ground truth the generator worked from, for comparisons in demos/tests.
#[derive(Debug, Clone)]
pub struct SampleTruth {
    pub zetas: Vec<(String, f64)>,
    /// Atomic fractions over the ROI, indexed `[slot][pixel]`.
    pub atomic_fraction: Vec<Vec<f64>>,
    /// Thickness over the ROI (nm).
    pub thickness_nm: Vec<f64>,
}

/// Generated scan plus the run configuration fragments it implies.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub profiles: IntensityProfiles,
    pub reference: ReferenceSpec,
    pub roi: PixelRange,
    pub truth: SampleTruth,
}

/// Generate a synthetic scan from the spec.
pub fn generate_sample(spec: &SampleSpec) -> Result<SampleData, QuantError> {
    spec.validate()?;
    spec.acquisition.validate()?;

    let elements = ElementSet::ternary(spec.elements.clone())?;
    spec.roles.validate(&elements)?;
    let masses = elements.atomic_masses()?;
    let densities = elements.densities_g_cm3()?;
    let dose = spec.acquisition.dose_per_pixel();

    let mut zetas = vec![0.0_f64; elements.len()];
    for (symbol, zeta) in &spec.zetas {
        zetas[elements.slot(symbol)?] = *zeta;
    }
    if zetas.iter().any(|z| *z <= 0.0) {
        return Err(QuantError::InvalidParameter(
            "ground-truth zetas must cover all three elements".to_string(),
        ));
    }

    let n_total = spec.n_reference_pixels + spec.n_roi_pixels;
    let mut counts = vec![Vec::with_capacity(n_total); elements.len()];

    // Reference segment: fixed binary weight composition, fixed thickness.
    let mut reference_weight = vec![0.0_f64; elements.len()];
    for (symbol, w) in &spec.reference_weight_fractions {
        reference_weight[elements.slot(symbol)?] = *w;
    }
    let reference_density = physics::mixture_density_g_cm3(&reference_weight, &densities)?;
    let reference_rho_t = reference_density * 1e3 * spec.reference_thickness_nm * 1e-9;
    for _ in 0..spec.n_reference_pixels {
        for slot in 0..elements.len() {
            counts[slot].push(reference_weight[slot] * dose * reference_rho_t / zetas[slot]);
        }
    }

    // Region of interest: unknown ramps, constant stays put, thickness wedge.
    let slot_constant = elements.slot(&spec.roles.constant)?;
    let slot_unknown = elements.slot(&spec.roles.unknown)?;
    let slot_rest = (0..elements.len())
        .find(|s| *s != slot_constant && *s != slot_unknown)
        .expect("ternary set always has a third slot");

    let mut truth_atomic = vec![Vec::with_capacity(spec.n_roi_pixels); elements.len()];
    let mut truth_thickness = Vec::with_capacity(spec.n_roi_pixels);
    for px in 0..spec.n_roi_pixels {
        let u = px as f64 / (spec.n_roi_pixels as f64 - 1.0);
        let x_unknown =
            spec.unknown_at_range.0 + u * (spec.unknown_at_range.1 - spec.unknown_at_range.0);
        let mut atomic = vec![0.0_f64; elements.len()];
        atomic[slot_constant] = spec.constant_at_fraction;
        atomic[slot_unknown] = x_unknown;
        atomic[slot_rest] = 1.0 - spec.constant_at_fraction - x_unknown;

        let weight = physics::atomic_to_weight(&atomic, &masses)?;
        let density = physics::mixture_density_g_cm3(&weight, &densities)?;
        let thickness_nm = spec.roi_thickness_range_nm.0
            + u * (spec.roi_thickness_range_nm.1 - spec.roi_thickness_range_nm.0);
        let rho_t = density * 1e3 * thickness_nm * 1e-9;

        for slot in 0..elements.len() {
            counts[slot].push(weight[slot] * dose * rho_t / zetas[slot]);
            truth_atomic[slot].push(atomic[slot]);
        }
        truth_thickness.push(thickness_nm);
    }

    if spec.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(spec.seed_hash());
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| QuantError::InvalidParameter(format!("noise distribution: {e}")))?;
        for profile in &mut counts {
            for value in profile.iter_mut() {
                if *value > 0.0 {
                    let z: f64 = normal.sample(&mut rng);
                    // Counting statistics: sigma ~ sqrt(N). Clamp so noise can
                    // never drive a pixel to a nonpositive count.
                    *value = (*value + value.sqrt() * spec.noise * z).max(*value * 0.01);
                }
            }
        }
    }

    let positions: Vec<f64> = (0..n_total).map(|i| i as f64 * spec.pixel_size_nm).collect();
    let profiles = IntensityProfiles::new(elements, positions, counts)?;

    let reference = ReferenceSpec {
        range: PixelRange::new(0, spec.n_reference_pixels)?,
        weight_fractions: spec.reference_weight_fractions.to_vec(),
        density_g_cm3: reference_density,
        thickness_nm: spec.reference_thickness_nm,
    };
    let roi = PixelRange::new(spec.n_reference_pixels, n_total)?;

    Ok(SampleData {
        profiles,
        reference,
        roi,
        truth: SampleTruth {
            zetas: spec.zetas.clone(),
            atomic_fraction: truth_atomic,
            thickness_nm: truth_thickness,
        },
    })
}
