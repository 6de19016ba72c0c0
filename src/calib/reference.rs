//! Reference-region calibration.
//!
//! The zeta-factor equation relates measured intensity to composition and
//! mass-thickness:
//!
//! ```text
//! intensity = weight_fraction * dose * mass_thickness / zeta
//! ```
//!
//! Over a region of known, fixed composition this inverts directly:
//!
//! ```text
//! zeta = dose * mass_thickness * weight_fraction / intensity
//! ```
//!
//! with `intensity` the total counts of the element's line over the region and
//! `dose` the total electron dose deposited there.

use crate::domain::{AcquisitionParams, IntensityProfiles, ReferenceSpec, RoleSpec};
use crate::error::QuantError;

/// Closed-form zeta-factor from reference-region quantities.
///
/// Deterministic, pure function of its inputs.
pub fn determine_zeta_factor(
    dose: f64,
    mass_thickness: f64,
    weight_fraction: f64,
    intensity: f64,
) -> Result<f64, QuantError> {
    if !(dose.is_finite() && dose > 0.0) {
        return Err(QuantError::InvalidParameter(format!(
            "dose must be positive, got {dose}"
        )));
    }
    if !(mass_thickness.is_finite() && mass_thickness > 0.0) {
        return Err(QuantError::InvalidParameter(format!(
            "mass-thickness must be positive, got {mass_thickness}"
        )));
    }
    if !(weight_fraction.is_finite() && weight_fraction > 0.0 && weight_fraction <= 1.0) {
        return Err(QuantError::InvalidParameter(format!(
            "weight fraction must be in (0, 1], got {weight_fraction}"
        )));
    }
    if !(intensity.is_finite() && intensity > 0.0) {
        return Err(QuantError::DegenerateSignal {
            context: "reference calibration".to_string(),
            reason: format!("total line intensity is {intensity}, need a positive signal"),
        });
    }
    Ok(dose * mass_thickness * weight_fraction / intensity)
}

/// Calibrate the two reference elements' zeta-factors from the reference
/// region of the scan.
///
/// Returns `(symbol, zeta)` pairs in the order the reference composition was
/// given. No side effects.
pub fn calibrate_reference(
    profiles: &IntensityProfiles,
    roles: &RoleSpec,
    reference: &ReferenceSpec,
    acquisition: &AcquisitionParams,
) -> Result<Vec<(String, f64)>, QuantError> {
    roles.validate(profiles.elements())?;
    reference.validate(roles)?;
    acquisition.validate()?;

    let region = profiles.select(reference.range)?;
    let dose = acquisition.total_dose(region.n_pixels());
    let mass_thickness = reference.mass_thickness_kg_m2();

    let mut zetas = Vec::with_capacity(reference.weight_fractions.len());
    for (symbol, weight_fraction) in &reference.weight_fractions {
        let slot = region.elements().slot(symbol)?;
        let intensity: f64 = region.counts(slot).iter().sum();
        let zeta = determine_zeta_factor(dose, mass_thickness, *weight_fraction, intensity)
            .map_err(|err| match err {
                QuantError::DegenerateSignal { reason, .. } => QuantError::DegenerateSignal {
                    context: format!(
                        "reference region pixels {}:{}, line {}",
                        reference.range.start,
                        reference.range.end,
                        region.elements().lines()[slot].line
                    ),
                    reason,
                },
                other => other,
            })?;
        zetas.push((symbol.clone(), zeta));
    }
    Ok(zetas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ElementLine, ElementSet, PixelRange};

    fn algaas() -> ElementSet {
        ElementSet::ternary(vec![
            ElementLine::with_default_line("Al"),
            ElementLine::with_default_line("As"),
            ElementLine::with_default_line("Ga"),
        ])
        .unwrap()
    }

    #[test]
    fn closed_form_is_exact() {
        let zeta = determine_zeta_factor(2.0e9, 5.32e-4, 0.5, 1.0e4).unwrap();
        assert!((zeta - 2.0e9 * 5.32e-4 * 0.5 / 1.0e4).abs() < 1e-9);
    }

    #[test]
    fn zero_intensity_is_degenerate() {
        let err = determine_zeta_factor(2.0e9, 5.32e-4, 0.5, 0.0).unwrap_err();
        assert!(matches!(err, QuantError::DegenerateSignal { .. }));
    }

    #[test]
    fn nonpositive_dose_is_invalid() {
        let err = determine_zeta_factor(0.0, 5.32e-4, 0.5, 1.0e4).unwrap_err();
        assert!(matches!(err, QuantError::InvalidParameter(_)));
    }

    #[test]
    fn reference_calibration_recovers_both_elements() {
        // Reference region: 4 pixels, 25 counts/pixel of As and 30 of Ga.
        let profiles = IntensityProfiles::new(
            algaas(),
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                vec![0.0; 4],
                vec![25.0; 4],
                vec![30.0; 4],
            ],
        )
        .unwrap();
        let roles = RoleSpec {
            reference: ["As".to_string(), "Ga".to_string()],
            constant: "As".to_string(),
            unknown: "Al".to_string(),
        };
        let reference = ReferenceSpec {
            range: PixelRange::new(0, 4).unwrap(),
            weight_fractions: vec![("As".to_string(), 0.5), ("Ga".to_string(), 0.5)],
            density_g_cm3: 5.32,
            thickness_nm: 100.0,
        };
        let acquisition = AcquisitionParams {
            probe_current_na: 0.5,
            live_time_s: 0.01,
        };

        let zetas = calibrate_reference(&profiles, &roles, &reference, &acquisition).unwrap();
        assert_eq!(zetas.len(), 2);

        let dose = acquisition.total_dose(4);
        let mass_thickness = reference.mass_thickness_kg_m2();
        let (symbol_as, zeta_as) = &zetas[0];
        assert_eq!(symbol_as, "As");
        assert!((zeta_as - dose * mass_thickness * 0.5 / 100.0).abs() < 1e-9 * zeta_as);
        let (symbol_ga, zeta_ga) = &zetas[1];
        assert_eq!(symbol_ga, "Ga");
        assert!((zeta_ga - dose * mass_thickness * 0.5 / 120.0).abs() < 1e-9 * zeta_ga);
    }
}
