//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads a profile CSV or generates a synthetic scan
//! - runs reference calibration + unknown-zeta search + solver
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, DemoArgs, QuantifyArgs};
use crate::data::{SampleData, SampleSpec, generate_sample};
use crate::domain::{QuantConfig, SearchSettings};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `zq` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Quantify(args) => handle_quantify(args, OutputMode::Full),
        Command::Zeta(args) => handle_quantify(args, OutputMode::ZetaOnly),
        Command::Demo(args) => handle_demo(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    ZetaOnly,
}

fn handle_quantify(args: QuantifyArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = quant_config_from_args(&args);
    let run = pipeline::run_quantify(&config)?;

    match mode {
        OutputMode::Full => {
            println!(
                "{}",
                crate::report::format_run_summary(&config, &run.calibration, &run.stats)
            );
        }
        OutputMode::ZetaOnly => {
            println!("{}", crate::report::format_calibration(&run.calibration));
        }
    }

    write_outputs(&config, &run)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let spec = SampleSpec::algaas_demo(args.seed, args.noise);
    let sample = generate_sample(&spec)?;
    let config = demo_config(&spec, &sample, &args);

    let run = pipeline::run_quantify_with_profiles(&config, &sample.profiles)?;

    println!(
        "{}",
        crate::report::format_run_summary(&config, &run.calibration, &run.stats)
    );
    println!("{}", format_truth_check(&run, &sample, &spec));

    write_outputs(&config, &run)
}

fn write_outputs(config: &QuantConfig, run: &pipeline::RunOutput) -> Result<(), AppError> {
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.profiles)?;
    }
    if let Some(path) = &config.export_profile {
        let profile =
            crate::io::profile::profile_file(&run.calibration, &run.profiles, &config.roles);
        crate::io::profile::write_profile_json(path, &profile)?;
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(config, &run.calibration)?;
        println!("Debug bundle: {}", path.display());
    }
    Ok(())
}

pub fn quant_config_from_args(args: &QuantifyArgs) -> QuantConfig {
    QuantConfig {
        input: Some(args.input.clone()),
        elements: args.elements.clone(),
        roles: crate::domain::RoleSpec {
            reference: [
                args.reference.first().map(|(s, _)| s.clone()).unwrap_or_default(),
                args.reference.get(1).map(|(s, _)| s.clone()).unwrap_or_default(),
            ],
            constant: args.constant.clone(),
            unknown: args.unknown.clone(),
        },
        reference: crate::domain::ReferenceSpec {
            range: args.ref_range,
            weight_fractions: args.reference.clone(),
            density_g_cm3: args.ref_density,
            thickness_nm: args.ref_thickness_nm,
        },
        roi: args.roi,
        acquisition: crate::domain::AcquisitionParams {
            probe_current_na: args.probe_current_na,
            live_time_s: args.live_time_s,
        },
        search: search_settings(&args.search),
        export_results: args.output.export.clone(),
        export_profile: args.output.export_profile.clone(),
        debug_bundle: args.output.debug_bundle,
    }
}

fn demo_config(spec: &SampleSpec, sample: &SampleData, args: &DemoArgs) -> QuantConfig {
    QuantConfig {
        input: None,
        elements: spec.elements.clone(),
        roles: spec.roles.clone(),
        reference: sample.reference.clone(),
        roi: sample.roi,
        acquisition: spec.acquisition,
        search: search_settings(&args.search),
        export_results: args.output.export.clone(),
        export_profile: args.output.export_profile.clone(),
        debug_bundle: args.output.debug_bundle,
    }
}

fn search_settings(args: &crate::cli::SearchArgs) -> SearchSettings {
    SearchSettings {
        ceiling_ratio: args.ceiling_ratio,
        tolerance_step: args.tolerance_step,
        initial_tolerance: args.initial_tolerance,
        max_iterations: args.max_iterations,
    }
}

/// Compare a demo run against the generator's ground truth.
fn format_truth_check(
    run: &pipeline::RunOutput,
    sample: &SampleData,
    spec: &SampleSpec,
) -> String {
    let mut out = String::new();
    out.push_str("Ground truth check:\n");

    for (symbol, true_zeta) in &sample.truth.zetas {
        let entry = run.calibration.entries.iter().find(|e| e.symbol == *symbol);
        if let Some(entry) = entry {
            out.push_str(&format!(
                "- zeta({symbol}): solved {:.3} vs true {:.3}\n",
                entry.zeta, true_zeta
            ));
        }
    }

    let mut at_err_max: f64 = 0.0;
    for slot in 0..run.profiles.atomic_fraction.len() {
        for px in 0..run.profiles.positions_nm.len() {
            let err =
                (run.profiles.atomic_fraction[slot][px] - sample.truth.atomic_fraction[slot][px])
                    .abs();
            at_err_max = at_err_max.max(err);
        }
    }
    let mut thickness_err_max: f64 = 0.0;
    for px in 0..run.profiles.positions_nm.len() {
        thickness_err_max = thickness_err_max
            .max((run.profiles.thickness_nm[px] - sample.truth.thickness_nm[px]).abs());
    }
    out.push_str(&format!(
        "- max |at. fraction error| = {at_err_max:.2e}, max |thickness error| = {thickness_err_max:.2e} nm (noise={})\n",
        spec.noise
    ));

    out
}
