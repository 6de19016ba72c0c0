//! Read/write quantified-profile JSON files.
//!
//! Profile JSON is the "portable" representation of a quantified run:
//!
//! - element set and calibration roles
//! - the full zeta-factor vector with provenance (reference vs solved)
//! - search diagnostics (accepted tolerance, spread, iterations)
//! - the composition/thickness profiles on the scan-position axis
//!
//! The schema is defined by `domain::ProfileFile`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::domain::{ProfileFile, QuantProfiles, RoleSpec, ZetaCalibration};
use crate::error::AppError;

/// Assemble the serializable profile file from run outputs.
pub fn profile_file(
    calibration: &ZetaCalibration,
    profiles: &QuantProfiles,
    roles: &RoleSpec,
) -> ProfileFile {
    let mut atomic_fraction = BTreeMap::new();
    for (slot, element) in profiles.elements.lines().iter().enumerate() {
        atomic_fraction.insert(
            element.symbol.clone(),
            profiles.atomic_fraction[slot].clone(),
        );
    }

    ProfileFile {
        tool: "zq".to_string(),
        elements: profiles.elements.lines().to_vec(),
        roles: roles.clone(),
        zetas: calibration.entries.clone(),
        accepted_tolerance: calibration.outcome.tolerance,
        spread: calibration.outcome.spread,
        iterations: calibration.outcome.iterations,
        positions_nm: profiles.positions_nm.clone(),
        atomic_fraction,
        mass_thickness_kg_m2: profiles.mass_thickness_kg_m2.clone(),
        thickness_nm: profiles.thickness_nm.clone(),
    }
}

/// Write a profile JSON file.
pub fn write_profile_json(path: &Path, profile: &ProfileFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create profile JSON '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer_pretty(file, profile)
        .map_err(|e| AppError::new(2, format!("Failed to write profile JSON: {e}")))?;
    Ok(())
}

/// Read a profile JSON file.
pub fn read_profile_json(path: &Path) -> Result<ProfileFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open profile JSON '{}': {e}", path.display()),
        )
    })?;
    let profile: ProfileFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid profile JSON: {e}")))?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ElementLine, ElementSet, Escalation, SearchOutcome, ZetaEntry, ZetaSource,
    };

    #[test]
    fn json_roundtrip_preserves_run() {
        let elements = ElementSet::ternary(vec![
            ElementLine::with_default_line("Al"),
            ElementLine::with_default_line("As"),
            ElementLine::with_default_line("Ga"),
        ])
        .unwrap();
        let roles = RoleSpec {
            reference: ["As".to_string(), "Ga".to_string()],
            constant: "As".to_string(),
            unknown: "Al".to_string(),
        };
        let calibration = ZetaCalibration {
            entries: vec![
                ZetaEntry {
                    symbol: "Al".to_string(),
                    line: "Al_Ka".to_string(),
                    zeta: 550.0,
                    source: ZetaSource::Solved,
                },
                ZetaEntry {
                    symbol: "As".to_string(),
                    line: "As_Ka".to_string(),
                    zeta: 680.0,
                    source: ZetaSource::Reference,
                },
                ZetaEntry {
                    symbol: "Ga".to_string(),
                    line: "Ga_Ka".to_string(),
                    zeta: 495.0,
                    source: ZetaSource::Reference,
                },
            ],
            outcome: SearchOutcome {
                zeta: 550.0,
                tolerance: 0.001,
                spread: 0.0004,
                iterations: 7350,
                escalations: vec![Escalation {
                    iteration: 6800,
                    ceiling_trial: 6801,
                    new_tolerance: 0.001,
                }],
            },
        };
        let profiles = QuantProfiles {
            elements,
            positions_nm: vec![80.0, 82.0],
            atomic_fraction: vec![vec![0.1, 0.2], vec![0.5, 0.5], vec![0.4, 0.3]],
            mass_thickness_kg_m2: vec![5.0e-4, 5.5e-4],
            thickness_nm: vec![95.0, 105.0],
        };

        let written = profile_file(&calibration, &profiles, &roles);

        let mut path = std::env::temp_dir();
        path.push(format!("zq_profile_test_{}.json", std::process::id()));
        write_profile_json(&path, &written).unwrap();
        let reread = read_profile_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reread.tool, "zq");
        assert_eq!(reread.zetas.len(), 3);
        assert_eq!(reread.iterations, 7350);
        assert_eq!(reread.atomic_fraction["As"], vec![0.5, 0.5]);
        assert_eq!(reread.thickness_nm, written.thickness_nm);
    }
}
