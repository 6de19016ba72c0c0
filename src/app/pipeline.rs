//! Shared quantification pipeline used by every CLI subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> reference calibration -> unknown-zeta search -> solve -> assemble
//!
//! The subcommands then focus on presentation (summary vs zeta table) and on
//! where the data comes from (CSV vs synthetic).

use crate::calib;
use crate::domain::{
    ElementSet, IntensityProfiles, ProfileStats, QuantConfig, QuantProfiles, ZetaCalibration,
    ZetaEntry, ZetaSource,
};
use crate::error::{AppError, QuantError};
use crate::io::ingest;
use crate::profiles;

/// All computed outputs of a single quantification run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub calibration: ZetaCalibration,
    pub profiles: QuantProfiles,
    pub stats: ProfileStats,
}

/// Execute the full pipeline from the configured CSV input.
pub fn run_quantify(config: &QuantConfig) -> Result<RunOutput, AppError> {
    let input = config
        .input
        .as_ref()
        .ok_or_else(|| AppError::new(2, "No input CSV configured."))?;
    let elements = ElementSet::ternary(config.elements.clone())?;
    let ingested = ingest::load_profiles(input, &elements)?;
    let output = run_quantify_with_profiles(config, &ingested.profiles)?;
    Ok(output)
}

/// Execute the pipeline on pre-loaded (or synthetic) intensity profiles.
pub fn run_quantify_with_profiles(
    config: &QuantConfig,
    profiles_in: &IntensityProfiles,
) -> Result<RunOutput, QuantError> {
    // 1) Reference calibration: closed-form zetas for the two known elements.
    let known = calib::calibrate_reference(
        profiles_in,
        &config.roles,
        &config.reference,
        &config.acquisition,
    )?;

    // 2) Unknown-zeta search over the region of interest.
    let roi = profiles_in.select(config.roi)?;
    let outcome = calib::solve_unknown_zeta(&roi, &config.roles, &known, &config.search)?;

    // 3) Assemble the full zeta vector, slot-aligned.
    let elements = profiles_in.elements();
    let mut zetas = vec![0.0_f64; elements.len()];
    let mut entries = Vec::with_capacity(elements.len());
    for (slot, line) in elements.lines().iter().enumerate() {
        let (zeta, source) = if line.symbol == config.roles.unknown {
            (outcome.zeta, ZetaSource::Solved)
        } else {
            let known_zeta = known
                .iter()
                .find(|(symbol, _)| *symbol == line.symbol)
                .map(|(_, zeta)| *zeta)
                .ok_or_else(|| QuantError::UnknownElement {
                    symbol: line.symbol.clone(),
                    context: "no zeta-factor from reference calibration".to_string(),
                })?;
            (known_zeta, ZetaSource::Reference)
        };
        zetas[slot] = zeta;
        entries.push(ZetaEntry {
            symbol: line.symbol.clone(),
            line: line.line.clone(),
            zeta,
            source,
        });
    }
    let calibration = ZetaCalibration { entries, outcome };

    // 4) Solve composition/thickness over the ROI and package as profiles.
    let solved = calib::solve(&roi, &zetas, &config.acquisition)?;
    let quantified = profiles::assemble(elements, roi.positions_nm(), solved)?;
    let stats = profiles::compute_stats(&quantified).ok_or_else(|| {
        QuantError::DegenerateSignal {
            context: "profile stats".to_string(),
            reason: "empty or non-finite quantified profiles".to_string(),
        }
    })?;

    Ok(RunOutput {
        calibration,
        profiles: quantified,
        stats,
    })
}
