//! Command-line parsing for the zeta-factor quantification tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the calibration/solver code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{ElementLine, PixelRange};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "zq", version, about = "EDX zeta-factor quantification (line profiles)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Quantify a profile CSV: calibrate, search the unknown zeta, solve
    /// composition/thickness, print the summary, and optionally export.
    Quantify(QuantifyArgs),
    /// Print the zeta calibration (closed-form + solved) only; useful for
    /// scripting.
    Zeta(QuantifyArgs),
    /// Run the full pipeline on a synthetic AlGaAs-on-GaAs scan and compare
    /// against the generator's ground truth.
    Demo(DemoArgs),
}

/// Common options for quantification runs.
#[derive(Debug, Parser, Clone)]
pub struct QuantifyArgs {
    /// Profile CSV: position_nm plus one counts column per line.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Quantified element, three times (e.g. `--element Al --element As
    /// --element Ga`). Append `=LINE` to override the default K-alpha line.
    #[arg(long = "element", value_parser = parse_element, required = true)]
    pub elements: Vec<ElementLine>,

    /// Reference-region weight fraction, twice (e.g. `--reference As=0.5`).
    #[arg(long = "reference", value_parser = parse_weight_fraction, required = true)]
    pub reference: Vec<(String, f64)>,

    /// The reference element whose atomic fraction is constant across the ROI.
    #[arg(long)]
    pub constant: String,

    /// The element whose zeta-factor is searched for.
    #[arg(long)]
    pub unknown: String,

    /// Reference-region pixel range, half-open (e.g. `0:40`).
    #[arg(long = "ref-range", value_parser = parse_pixel_range)]
    pub ref_range: PixelRange,

    /// Region-of-interest pixel range, half-open (e.g. `40:200`).
    #[arg(long, value_parser = parse_pixel_range)]
    pub roi: PixelRange,

    /// Reference material density (g/cm3).
    #[arg(long = "ref-density")]
    pub ref_density: f64,

    /// Reference region physical thickness (nm).
    #[arg(long = "ref-thickness")]
    pub ref_thickness_nm: f64,

    /// Probe current (nA).
    #[arg(long = "current", default_value_t = 0.5)]
    pub probe_current_na: f64,

    /// Live time per pixel (s).
    #[arg(long = "live-time", default_value_t = 0.01)]
    pub live_time_s: f64,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Search-control options (tunable heuristics, not physical constants).
#[derive(Debug, Parser, Clone)]
pub struct SearchArgs {
    /// Escalate once the trial zeta exceeds this multiple of the constant
    /// element's zeta.
    #[arg(long = "ceiling-ratio", default_value_t = 10.0)]
    pub ceiling_ratio: f64,

    /// Flatness tolerance increment per escalation.
    #[arg(long = "tolerance-step", default_value_t = 0.001)]
    pub tolerance_step: f64,

    /// Starting flatness tolerance.
    #[arg(long = "initial-tolerance", default_value_t = 0.0)]
    pub initial_tolerance: f64,

    /// Hard bound on search iterations.
    #[arg(long = "max-iterations", default_value_t = 2_000_000)]
    pub max_iterations: usize,
}

/// Export/diagnostic options shared by all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct OutputArgs {
    /// Export per-pixel results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the quantified profile (zetas + arrays) to JSON.
    #[arg(long = "export-profile")]
    pub export_profile: Option<PathBuf>,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long = "debug-bundle")]
    pub debug_bundle: bool,
}

/// Options for the synthetic demo run.
#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Random seed for the counting noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Relative scale of the sqrt(counts) noise; 0 for a noiseless scan.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn parse_element(text: &str) -> Result<ElementLine, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty element".to_string());
    }
    match text.split_once('=') {
        Some((symbol, line)) => {
            let (symbol, line) = (symbol.trim(), line.trim());
            if symbol.is_empty() || line.is_empty() {
                return Err(format!("invalid element '{text}' (want 'El' or 'El=Line')"));
            }
            Ok(ElementLine::new(symbol, line))
        }
        None => Ok(ElementLine::with_default_line(text)),
    }
}

fn parse_weight_fraction(text: &str) -> Result<(String, f64), String> {
    let (symbol, value) = text
        .split_once('=')
        .ok_or_else(|| format!("invalid reference fraction '{text}' (want 'El=0.5')"))?;
    let symbol = symbol.trim();
    let fraction: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid reference fraction '{text}' (want 'El=0.5')"))?;
    if symbol.is_empty() {
        return Err(format!("invalid reference fraction '{text}' (want 'El=0.5')"));
    }
    Ok((symbol.to_string(), fraction))
}

fn parse_pixel_range(text: &str) -> Result<PixelRange, String> {
    PixelRange::parse(text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_quantify_invocation() {
        let cli = Cli::try_parse_from([
            "zq",
            "quantify",
            "--input",
            "scan.csv",
            "--element",
            "Al",
            "--element",
            "As",
            "--element",
            "Ga",
            "--reference",
            "As=0.5",
            "--reference",
            "Ga=0.5",
            "--constant",
            "As",
            "--unknown",
            "Al",
            "--ref-range",
            "0:40",
            "--roi",
            "40:200",
            "--ref-density",
            "5.32",
            "--ref-thickness",
            "100",
        ])
        .unwrap();

        let Command::Quantify(args) = cli.command else {
            panic!("expected quantify");
        };
        assert_eq!(args.elements.len(), 3);
        assert_eq!(args.elements[0].line, "Al_Ka");
        assert_eq!(args.reference[0], ("As".to_string(), 0.5));
        assert_eq!(args.roi, PixelRange { start: 40, end: 200 });
        assert!((args.search.ceiling_ratio - 10.0).abs() < 1e-12);
    }

    #[test]
    fn element_line_override() {
        assert_eq!(
            parse_element("Ga=Ga_La").unwrap(),
            ElementLine::new("Ga", "Ga_La")
        );
        assert!(parse_element("=x").is_err());
    }

    #[test]
    fn weight_fraction_needs_symbol_and_number() {
        assert!(parse_weight_fraction("As").is_err());
        assert!(parse_weight_fraction("As=half").is_err());
        assert_eq!(
            parse_weight_fraction("Ga=0.25").unwrap(),
            ("Ga".to_string(), 0.25)
        );
    }

    #[test]
    fn demo_defaults_are_noiseless() {
        let cli = Cli::try_parse_from(["zq", "demo"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.seed, 42);
        assert_eq!(args.noise, 0.0);
    }
}
