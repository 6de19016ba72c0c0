//! Debug bundle writer for inspecting calibration inputs and the search trace.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::{QuantConfig, ZetaCalibration};
use crate::error::AppError;

/// Write a markdown bundle under `debug/` describing the run.
///
/// The bundle is append-only diagnostics; nothing in the pipeline reads it
/// back.
pub fn write_debug_bundle(
    config: &QuantConfig,
    calibration: &ZetaCalibration,
) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir)
        .map_err(|e| AppError::new(2, format!("Failed to create debug dir: {e}")))?;

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(format!("zq_debug_{ts}.md"));

    let mut out = String::new();
    out.push_str("# zq debug bundle\n");
    out.push_str(&format!("- generated_unix: {ts}\n"));
    match &config.input {
        Some(input) => out.push_str(&format!("- input: {}\n", input.display())),
        None => out.push_str("- input: synthetic\n"),
    }
    out.push_str(&format!(
        "- roles: reference=[{}, {}] constant={} unknown={}\n",
        config.roles.reference[0],
        config.roles.reference[1],
        config.roles.constant,
        config.roles.unknown
    ));
    out.push_str(&format!(
        "- reference: pixels {}:{}, rho={:.3} g/cm3, t={:.1} nm\n",
        config.reference.range.start,
        config.reference.range.end,
        config.reference.density_g_cm3,
        config.reference.thickness_nm
    ));
    out.push_str(&format!(
        "- roi: pixels {}:{}\n",
        config.roi.start, config.roi.end
    ));
    out.push_str(&format!(
        "- search: ceiling_ratio={:.1}, tolerance_step={}, initial_tolerance={}, max_iterations={}\n",
        config.search.ceiling_ratio,
        config.search.tolerance_step,
        config.search.initial_tolerance,
        config.search.max_iterations
    ));

    out.push_str("\n## Zeta factors\n");
    out.push_str("| line | zeta | source |\n");
    out.push_str("| - | - | - |\n");
    for entry in &calibration.entries {
        out.push_str(&format!(
            "| {} | {:.6} | {:?} |\n",
            entry.line, entry.zeta, entry.source
        ));
    }

    let outcome = &calibration.outcome;
    out.push_str("\n## Search\n");
    out.push_str(&format!(
        "- accepted: zeta={}, tolerance={}, spread={:.3e}, iterations={}\n",
        outcome.zeta, outcome.tolerance, outcome.spread, outcome.iterations
    ));
    if outcome.escalations.is_empty() {
        out.push_str("- escalations: none\n");
    } else {
        out.push_str("\n| iteration | ceiling trial | new tolerance |\n");
        out.push_str("| - | - | - |\n");
        for esc in &outcome.escalations {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                esc.iteration, esc.ceiling_trial, esc.new_tolerance
            ));
        }
    }

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(2, format!("Failed to create debug file: {e}")))?;
    file.write_all(out.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write debug file: {e}")))?;

    Ok(path)
}
