//! Composition conversion laws.
//!
//! The quantification core works in weight fractions (that is what the
//! zeta-factor equation relates to intensity) but reports atomic fractions.
//!
//! Laws:
//!
//! - mass fraction -> mole fraction: `x_i = (w_i / M_i) / sum_j (w_j / M_j)`
//! - mole fraction -> mass fraction: `w_i = x_i * M_i / sum_j (x_j * M_j)`
//! - mixture density (mass-weighted harmonic mean): `1/rho = sum_i (w_i / rho_i)`
//!
//! All three normalize by the input sum, so callers may pass fractions that
//! sum to anything positive; the outputs always sum to 1 (density excepted).

use crate::error::QuantError;

fn check_aligned(context: &str, fractions: &[f64], per_element: &[f64]) -> Result<(), QuantError> {
    if fractions.len() != per_element.len() {
        return Err(QuantError::InputShape {
            context: context.to_string(),
            got: per_element.len(),
            expected: fractions.len(),
        });
    }
    if fractions.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(QuantError::InvalidParameter(format!(
            "{context}: fractions must be finite and non-negative"
        )));
    }
    if per_element.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Err(QuantError::InvalidParameter(format!(
            "{context}: per-element constants must be finite and positive"
        )));
    }
    Ok(())
}

/// Convert weight fractions to atomic (mole) fractions.
pub fn weight_to_atomic(weight: &[f64], masses: &[f64]) -> Result<Vec<f64>, QuantError> {
    check_aligned("weight_to_atomic", weight, masses)?;

    let moles: Vec<f64> = weight.iter().zip(masses).map(|(w, m)| w / m).collect();
    let total: f64 = moles.iter().sum();
    if total <= 0.0 {
        return Err(QuantError::DegenerateSignal {
            context: "weight_to_atomic".to_string(),
            reason: "composition sums to zero".to_string(),
        });
    }

    Ok(moles.into_iter().map(|n| n / total).collect())
}

/// Convert atomic (mole) fractions to weight fractions.
pub fn atomic_to_weight(atomic: &[f64], masses: &[f64]) -> Result<Vec<f64>, QuantError> {
    check_aligned("atomic_to_weight", atomic, masses)?;

    let grams: Vec<f64> = atomic.iter().zip(masses).map(|(x, m)| x * m).collect();
    let total: f64 = grams.iter().sum();
    if total <= 0.0 {
        return Err(QuantError::DegenerateSignal {
            context: "atomic_to_weight".to_string(),
            reason: "composition sums to zero".to_string(),
        });
    }

    Ok(grams.into_iter().map(|g| g / total).collect())
}

/// Density (g/cm3) of a mixture of pure elements from its weight fractions.
pub fn mixture_density_g_cm3(weight: &[f64], densities: &[f64]) -> Result<f64, QuantError> {
    check_aligned("mixture_density", weight, densities)?;

    let total: f64 = weight.iter().sum();
    if total <= 0.0 {
        return Err(QuantError::DegenerateSignal {
            context: "mixture_density".to_string(),
            reason: "composition sums to zero".to_string(),
        });
    }

    let inv: f64 = weight
        .iter()
        .zip(densities)
        .map(|(w, rho)| (w / total) / rho)
        .sum();
    Ok(1.0 / inv)
}
