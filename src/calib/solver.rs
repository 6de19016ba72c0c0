//! Composition/thickness solver.
//!
//! Given intensities for all three elements and the full zeta-factor vector,
//! the zeta equation inverts jointly across elements at each pixel:
//!
//! - `zeta[e] * intensity[e] = weight_fraction[e] * dose * mass_thickness`
//! - summing over elements (weight fractions sum to 1):
//!   `sum_e zeta[e] * intensity[e] = dose * mass_thickness`
//! - individual ratios give the weight-fraction composition
//!
//! Atomic fractions follow from the mass->mole conversion law, and physical
//! thickness from a mixture density derived from the solved composition.
//!
//! Pure functions of their inputs; rerunning on identical inputs yields
//! bit-identical outputs.

use crate::domain::{AcquisitionParams, IntensityProfiles};
use crate::error::QuantError;
use crate::physics;

/// Per-pixel outputs of the joint inversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedMaps {
    /// Atomic fractions indexed `[slot][pixel]`.
    pub atomic_fraction: Vec<Vec<f64>>,
    /// Mass-thickness per pixel (kg/m2).
    pub mass_thickness_kg_m2: Vec<f64>,
    /// Physical thickness per pixel (nm).
    pub thickness_nm: Vec<f64>,
}

fn check_zetas(profiles: &IntensityProfiles, zetas: &[f64]) -> Result<(), QuantError> {
    if zetas.len() != profiles.elements().len() {
        return Err(QuantError::InputShape {
            context: "zeta-factor vector".to_string(),
            got: zetas.len(),
            expected: profiles.elements().len(),
        });
    }
    if zetas.iter().any(|z| !z.is_finite() || *z <= 0.0) {
        return Err(QuantError::InvalidParameter(
            "zeta-factors must be finite and positive".to_string(),
        ));
    }
    Ok(())
}

/// Zeta-weighted intensities at one pixel, plus their sum.
///
/// A nonpositive count (vacuum/edge pixel) or a vanishing total is surfaced as
/// a degenerate-signal error naming the pixel rather than propagated as
/// NaN/Inf composition.
fn weighted_at(
    profiles: &IntensityProfiles,
    zetas: &[f64],
    pixel: usize,
) -> Result<(Vec<f64>, f64), QuantError> {
    let mut weighted = Vec::with_capacity(zetas.len());
    for (slot, zeta) in zetas.iter().enumerate() {
        let counts = profiles.counts(slot)[pixel];
        if !(counts.is_finite() && counts > 0.0) {
            return Err(QuantError::DegenerateSignal {
                context: format!("pixel {pixel}"),
                reason: format!(
                    "line {} has intensity {counts}, need a positive signal",
                    profiles.elements().lines()[slot].line
                ),
            });
        }
        weighted.push(zeta * counts);
    }
    let total: f64 = weighted.iter().sum();
    if total <= 0.0 {
        return Err(QuantError::DegenerateSignal {
            context: format!("pixel {pixel}"),
            reason: "total weighted intensity is zero".to_string(),
        });
    }
    Ok((weighted, total))
}

/// Atomic-fraction composition profiles for a trial zeta vector.
///
/// This is the inner evaluation of the flatness search as well as the first
/// half of the full solve. Output is indexed `[slot][pixel]`; each pixel's
/// fractions sum to 1.
pub fn atomic_composition(
    profiles: &IntensityProfiles,
    zetas: &[f64],
) -> Result<Vec<Vec<f64>>, QuantError> {
    check_zetas(profiles, zetas)?;
    let masses = profiles.elements().atomic_masses()?;

    let n_pixels = profiles.n_pixels();
    let mut atomic = vec![Vec::with_capacity(n_pixels); zetas.len()];
    for pixel in 0..n_pixels {
        let (weighted, total) = weighted_at(profiles, zetas, pixel)?;
        let weight: Vec<f64> = weighted.iter().map(|w| w / total).collect();
        let at = physics::weight_to_atomic(&weight, &masses)?;
        for (slot, x) in at.into_iter().enumerate() {
            atomic[slot].push(x);
        }
    }
    Ok(atomic)
}

/// Solve per-pixel atomic composition, mass-thickness, and physical thickness.
pub fn solve(
    profiles: &IntensityProfiles,
    zetas: &[f64],
    acquisition: &AcquisitionParams,
) -> Result<SolvedMaps, QuantError> {
    check_zetas(profiles, zetas)?;
    acquisition.validate()?;
    let masses = profiles.elements().atomic_masses()?;
    let densities = profiles.elements().densities_g_cm3()?;
    let dose_per_pixel = acquisition.dose_per_pixel();

    let n_pixels = profiles.n_pixels();
    let mut atomic = vec![Vec::with_capacity(n_pixels); zetas.len()];
    let mut mass_thickness = Vec::with_capacity(n_pixels);
    let mut thickness = Vec::with_capacity(n_pixels);

    for pixel in 0..n_pixels {
        let (weighted, total) = weighted_at(profiles, zetas, pixel)?;
        let weight: Vec<f64> = weighted.iter().map(|w| w / total).collect();

        let rho_t = total / dose_per_pixel;
        mass_thickness.push(rho_t);

        let at = physics::weight_to_atomic(&weight, &masses)?;
        for (slot, x) in at.into_iter().enumerate() {
            atomic[slot].push(x);
        }

        let density = physics::mixture_density_g_cm3(&weight, &densities)?;
        // kg/m2 over kg/m3 gives meters; report nanometers.
        thickness.push(rho_t / (density * 1e3) * 1e9);
    }

    Ok(SolvedMaps {
        atomic_fraction: atomic,
        mass_thickness_kg_m2: mass_thickness,
        thickness_nm: thickness,
    })
}
