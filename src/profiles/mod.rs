//! Profile assembly: packaging solver output as 1-D profiles on the scan axis.
//!
//! The solver works in per-pixel arrays; downstream consumers (reports,
//! exports) want them bundled with the position axis and summarized. Nothing
//! here mutates the inputs.

use crate::calib::solver::SolvedMaps;
use crate::domain::{ElementSet, ElementStats, ProfileStats, QuantProfiles};
use crate::error::QuantError;

/// Bundle solved maps with the scan-position axis.
pub fn assemble(
    elements: &ElementSet,
    positions_nm: &[f64],
    solved: SolvedMaps,
) -> Result<QuantProfiles, QuantError> {
    if solved.atomic_fraction.len() != elements.len() {
        return Err(QuantError::InputShape {
            context: "assembled composition profiles".to_string(),
            got: solved.atomic_fraction.len(),
            expected: elements.len(),
        });
    }
    for (slot, profile) in solved.atomic_fraction.iter().enumerate() {
        if profile.len() != positions_nm.len() {
            return Err(QuantError::InputShape {
                context: format!(
                    "composition profile for {}",
                    elements.lines()[slot].symbol
                ),
                got: profile.len(),
                expected: positions_nm.len(),
            });
        }
    }
    if solved.thickness_nm.len() != positions_nm.len() {
        return Err(QuantError::InputShape {
            context: "thickness profile".to_string(),
            got: solved.thickness_nm.len(),
            expected: positions_nm.len(),
        });
    }

    Ok(QuantProfiles {
        elements: elements.clone(),
        positions_nm: positions_nm.to_vec(),
        atomic_fraction: solved.atomic_fraction,
        mass_thickness_kg_m2: solved.mass_thickness_kg_m2,
        thickness_nm: solved.thickness_nm,
    })
}

/// Summary stats over the assembled profiles.
///
/// Returns `None` for empty or non-finite profiles.
pub fn compute_stats(profiles: &QuantProfiles) -> Option<ProfileStats> {
    if profiles.positions_nm.is_empty() {
        return None;
    }

    let (position_min_nm, position_max_nm) = min_max(&profiles.positions_nm)?;
    let (thickness_min_nm, thickness_max_nm) = min_max(&profiles.thickness_nm)?;

    let mut elements = Vec::with_capacity(profiles.elements.len());
    for (slot, line) in profiles.elements.lines().iter().enumerate() {
        let profile = &profiles.atomic_fraction[slot];
        let (at_min, at_max) = min_max(profile)?;
        let at_mean = profile.iter().sum::<f64>() / profile.len() as f64;
        elements.push(ElementStats {
            symbol: line.symbol.clone(),
            at_min,
            at_mean,
            at_max,
        });
    }

    Some(ProfileStats {
        n_pixels: profiles.positions_nm.len(),
        position_min_nm,
        position_max_nm,
        elements,
        thickness_min_nm,
        thickness_max_nm,
    })
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if !v.is_finite() {
            return None;
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}
