//! Run summary and calibration tables.

use crate::domain::{ProfileStats, QuantConfig, ZetaCalibration, ZetaSource};

/// Format the full run summary (configuration + calibration + profile stats).
pub fn format_run_summary(
    config: &QuantConfig,
    calibration: &ZetaCalibration,
    stats: &ProfileStats,
) -> String {
    let mut out = String::new();

    out.push_str("=== zq - EDX zeta-factor quantification ===\n");
    let lines: Vec<&str> = config
        .elements
        .iter()
        .map(|e| e.line.as_str())
        .collect();
    out.push_str(&format!("Lines: {}\n", lines.join(", ")));
    out.push_str(&format!(
        "Roles: reference=[{}, {}] constant={} unknown={}\n",
        config.roles.reference[0],
        config.roles.reference[1],
        config.roles.constant,
        config.roles.unknown
    ));

    let weights: Vec<String> = config
        .reference
        .weight_fractions
        .iter()
        .map(|(symbol, w)| format!("wt({symbol})={w:.3}"))
        .collect();
    out.push_str(&format!(
        "Reference: pixels [{}, {}) | {} | rho={:.3} g/cm3 | t={:.1} nm\n",
        config.reference.range.start,
        config.reference.range.end,
        weights.join(" "),
        config.reference.density_g_cm3,
        config.reference.thickness_nm
    ));
    out.push_str(&format!(
        "Acquisition: I={:.3} nA | live={:.4} s/px | dose/px={:.3e} e-\n",
        config.acquisition.probe_current_na,
        config.acquisition.live_time_s,
        config.acquisition.dose_per_pixel()
    ));

    out.push_str(&format_calibration(calibration));

    out.push_str(&format!(
        "\nProfiles: n={} px | x=[{:.1}, {:.1}] nm\n",
        stats.n_pixels, stats.position_min_nm, stats.position_max_nm
    ));
    out.push_str("  element   at% min /  mean /   max\n");
    for element in &stats.elements {
        out.push_str(&format!(
            "  {:<8} {:>7.2} {:>7.2} {:>7.2}\n",
            element.symbol,
            100.0 * element.at_min,
            100.0 * element.at_mean,
            100.0 * element.at_max
        ));
    }
    out.push_str(&format!(
        "Thickness: [{:.1}, {:.1}] nm\n",
        stats.thickness_min_nm, stats.thickness_max_nm
    ));

    out
}

/// Format the zeta-factor vector and search diagnostics.
pub fn format_calibration(calibration: &ZetaCalibration) -> String {
    let mut out = String::new();

    out.push_str("\nZeta factors:\n");
    for entry in &calibration.entries {
        let source = match entry.source {
            ZetaSource::Reference => "reference",
            ZetaSource::Solved => "solved",
        };
        out.push_str(&format!(
            "  {:<8} {:>10.3}  ({source})\n",
            entry.line, entry.zeta
        ));
    }

    let outcome = &calibration.outcome;
    out.push_str(&format!(
        "Search: accepted tolerance={:.4} | spread={:.3e} | iterations={} | escalations={}\n",
        outcome.tolerance,
        outcome.spread,
        outcome.iterations,
        outcome.escalations.len()
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AcquisitionParams, ElementLine, ElementStats, PixelRange, ReferenceSpec, RoleSpec,
        SearchOutcome, SearchSettings, ZetaEntry,
    };

    fn calibration() -> ZetaCalibration {
        ZetaCalibration {
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
                    zeta: 680.5,
                    source: ZetaSource::Reference,
                },
                ZetaEntry {
                    symbol: "Ga".to_string(),
                    line: "Ga_Ka".to_string(),
                    zeta: 495.2,
                    source: ZetaSource::Reference,
                },
            ],
            outcome: SearchOutcome {
                zeta: 550.0,
                tolerance: 0.0,
                spread: 2.0e-16,
                iterations: 550,
                escalations: vec![],
            },
        }
    }

    #[test]
    fn calibration_table_names_sources() {
        let text = format_calibration(&calibration());
        assert!(text.contains("Al_Ka"));
        assert!(text.contains("(solved)"));
        assert!(text.contains("(reference)"));
        assert!(text.contains("iterations=550"));
    }

    #[test]
    fn run_summary_includes_stats() {
        let config = QuantConfig {
            input: None,
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
            reference: ReferenceSpec {
                range: PixelRange::new(0, 40).unwrap(),
                weight_fractions: vec![("As".to_string(), 0.5), ("Ga".to_string(), 0.5)],
                density_g_cm3: 5.32,
                thickness_nm: 100.0,
            },
            roi: PixelRange::new(40, 200).unwrap(),
            acquisition: AcquisitionParams {
                probe_current_na: 0.5,
                live_time_s: 0.01,
            },
            search: SearchSettings::default(),
            export_results: None,
            export_profile: None,
            debug_bundle: false,
        };
        let stats = ProfileStats {
            n_pixels: 160,
            position_min_nm: 80.0,
            position_max_nm: 398.0,
            elements: vec![ElementStats {
                symbol: "As".to_string(),
                at_min: 0.499,
                at_mean: 0.5,
                at_max: 0.501,
            }],
            thickness_min_nm: 90.0,
            thickness_max_nm: 130.0,
        };

        let text = format_run_summary(&config, &calibration(), &stats);
        assert!(text.contains("Roles: reference=[As, Ga]"));
        assert!(text.contains("n=160 px"));
        assert!(text.contains("Thickness: [90.0, 130.0] nm"));
    }
}
