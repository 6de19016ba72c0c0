//! CSV ingest and validation.
//!
//! The input CSV carries one row per scan pixel:
//!
//! ```text
//! position_nm,Al_Ka,As_Ka,Ga_Ka
//! 0.0,0.0,8123.4,9866.1
//! 2.0,0.0,8130.9,9871.0
//! ...
//! ```
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 3)
//! - **Row-level validation** that reports *all* bad rows in one pass, then
//!   fails: a dropped pixel would silently shift every pixel-range index,
//!   so partial ingestion is never allowed
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no quantification logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ElementSet, IntensityProfiles};
use crate::error::AppError;

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    /// 1-based CSV line number.
    pub line: usize,
    pub message: String,
}

/// Summary stats about the ingested scan.
#[derive(Debug, Clone)]
pub struct IntensityStats {
    pub n_pixels: usize,
    pub position_min_nm: f64,
    pub position_max_nm: f64,
    /// Largest single-pixel count over all lines (a quick signal-level check).
    pub counts_max: f64,
}

/// Ingest output: validated profiles plus bookkeeping.
#[derive(Debug, Clone)]
pub struct IngestedProfiles {
    pub profiles: IntensityProfiles,
    pub rows_read: usize,
    pub stats: IntensityStats,
}

/// Load a profile CSV for the given element set.
pub fn load_profiles(path: &Path, elements: &ElementSet) -> Result<IngestedProfiles, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let position_col = *header_map.get("position_nm").ok_or_else(|| {
        AppError::new(3, "CSV is missing the required 'position_nm' column.")
    })?;
    let mut line_cols = Vec::with_capacity(elements.len());
    for element in elements.lines() {
        let col = *header_map.get(element.line.to_lowercase().as_str()).ok_or_else(|| {
            AppError::new(
                3,
                format!("CSV is missing the required '{}' column.", element.line),
            )
        })?;
        line_cols.push(col);
    }

    let mut positions = Vec::new();
    let mut counts: Vec<Vec<f64>> = vec![Vec::new(); elements.len()];
    let mut row_errors: Vec<RowError> = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because records() starts after the header row and CSV line
        // numbers are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, position_col, &line_cols, positions.last().copied()) {
            Ok((position, row_counts)) => {
                positions.push(position);
                for (slot, value) in row_counts.into_iter().enumerate() {
                    counts[slot].push(value);
                }
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        let shown: Vec<String> = row_errors
            .iter()
            .take(5)
            .map(|e| format!("line {}: {}", e.line, e.message))
            .collect();
        let suffix = if row_errors.len() > 5 {
            format!(" (and {} more)", row_errors.len() - 5)
        } else {
            String::new()
        };
        return Err(AppError::new(
            3,
            format!(
                "{} malformed row(s) in '{}'{suffix}:\n{}",
                row_errors.len(),
                path.display(),
                shown.join("\n")
            ),
        ));
    }

    if positions.is_empty() {
        return Err(AppError::new(
            3,
            format!("No data rows in '{}'.", path.display()),
        ));
    }

    let stats = IntensityStats {
        n_pixels: positions.len(),
        position_min_nm: positions[0],
        position_max_nm: positions[positions.len() - 1],
        counts_max: counts
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold(0.0, f64::max),
    };

    let profiles = IntensityProfiles::new(elements.clone(), positions, counts)
        .map_err(AppError::from)?;

    Ok(IngestedProfiles {
        profiles,
        rows_read,
        stats,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

fn parse_row(
    record: &StringRecord,
    position_col: usize,
    line_cols: &[usize],
    previous_position: Option<f64>,
) -> Result<(f64, Vec<f64>), String> {
    let position = parse_field(record, position_col, "position_nm")?;
    if let Some(previous) = previous_position {
        if position <= previous {
            return Err(format!(
                "position {position} is not strictly increasing (previous {previous})"
            ));
        }
    }

    let mut row_counts = Vec::with_capacity(line_cols.len());
    for &col in line_cols {
        let value = parse_field(record, col, "counts")?;
        if value < 0.0 {
            return Err(format!("negative counts {value}"));
        }
        row_counts.push(value);
    }
    Ok((position, row_counts))
}

fn parse_field(record: &StringRecord, col: usize, label: &str) -> Result<f64, String> {
    let raw = record
        .get(col)
        .ok_or_else(|| format!("missing {label} field"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("invalid {label} value '{raw}'"))?;
    if !value.is_finite() {
        return Err(format!("non-finite {label} value '{raw}'"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ElementLine;
    use std::io::Write;

    fn algaas() -> ElementSet {
        ElementSet::ternary(vec![
            ElementLine::with_default_line("Al"),
            ElementLine::with_default_line("As"),
            ElementLine::with_default_line("Ga"),
        ])
        .unwrap()
    }

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("zq_ingest_{name}_{}.csv", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_well_formed_csv() {
        let path = write_temp(
            "well_formed",
            "position_nm,Al_Ka,As_Ka,Ga_Ka\n\
             0.0,0.0,8123.4,9866.1\n\
             2.0,150.2,8130.9,9871.0\n\
             4.0,160.8,8140.0,9850.3\n",
        );
        let ingest = load_profiles(&path, &algaas()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ingest.rows_read, 3);
        assert_eq!(ingest.stats.n_pixels, 3);
        assert_eq!(ingest.stats.position_min_nm, 0.0);
        assert_eq!(ingest.stats.position_max_nm, 4.0);

        let slot_as = ingest.profiles.elements().slot("As").unwrap();
        assert_eq!(ingest.profiles.counts(slot_as)[1], 8130.9);
    }

    #[test]
    fn missing_line_column_is_schema_error() {
        let path = write_temp("missing_column", "position_nm,Al_Ka,As_Ka\n0.0,1.0,2.0\n");
        let err = load_profiles(&path, &algaas()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("Ga_Ka"));
    }

    #[test]
    fn malformed_rows_are_fatal_and_reported() {
        let path = write_temp(
            "malformed_rows",
            "position_nm,Al_Ka,As_Ka,Ga_Ka\n\
             0.0,1.0,2.0,3.0\n\
             2.0,not_a_number,2.0,3.0\n\
             0.0,1.0,2.0,3.0\n",
        );
        let err = load_profiles(&path, &algaas()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 3);
        let message = err.to_string();
        assert!(message.contains("line 3"), "{message}");
        assert!(message.contains("line 4"), "{message}");
    }

    #[test]
    fn negative_counts_are_rejected() {
        let path = write_temp(
            "negative_counts",
            "position_nm,Al_Ka,As_Ka,Ga_Ka\n\
             0.0,1.0,-2.0,3.0\n",
        );
        let err = load_profiles(&path, &algaas()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("negative"));
    }
}
