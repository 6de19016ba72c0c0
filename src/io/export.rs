//! Export per-pixel results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per pixel, one atomic-fraction column per element.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::QuantProfiles;
use crate::error::AppError;

/// Write per-pixel composition and thickness to a CSV file.
pub fn write_results_csv(path: &Path, profiles: &QuantProfiles) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;

    let mut header = String::from("position_nm");
    for element in profiles.elements.lines() {
        header.push_str(&format!(",{}_at_frac", element.symbol));
    }
    header.push_str(",mass_thickness_kg_m2,thickness_nm");
    writeln!(file, "{header}")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for px in 0..profiles.positions_nm.len() {
        let mut row = format!("{:.6}", profiles.positions_nm[px]);
        for slot in 0..profiles.elements.len() {
            row.push_str(&format!(",{:.8}", profiles.atomic_fraction[slot][px]));
        }
        row.push_str(&format!(
            ",{:.6e},{:.4}",
            profiles.mass_thickness_kg_m2[px], profiles.thickness_nm[px]
        ));
        writeln!(file, "{row}")
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
