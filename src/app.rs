//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads and normalizes benchmark data
//! - runs estimation or analysis
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{AnalyzeArgs, Cli, Command, FitArgs, InputArgs, SimulateArgs};
use crate::domain::{FitConfig, SampleConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `latfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Analyze(args) => handle_analyze(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&run.dataset, &run.initial, &run.summary)
    );

    if config.trace {
        println!("{}", crate::report::format_trace(&run.summary.points));
    }
    if config.top_n > 0 {
        let worst = crate::report::rank_worst_points(&run.summary.points, config.top_n);
        println!("{}", crate::report::format_worst_points(&worst));
    }

    // Optional exports.
    if let Some(path) = &config.export_summary {
        crate::io::export::write_summary_json(path, &run.summary, &run.dataset.name, &run.initial)?;
        log::info!("wrote summary to {}", path.display());
    }
    if let Some(path) = &config.export_points {
        crate::io::export::write_points_csv(path, &run.summary)?;
        log::info!("wrote points to {}", path.display());
    }

    Ok(())
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let dataset = load_inputs(&args.input)?;
    let params = args.params.to_params();
    let eval = pipeline::run_analysis(&dataset, &params)?;

    println!("=== latfit - analysis of '{}' ({} points) ===", dataset.name, dataset.len());
    println!(
        "Parameters: alpha={}, beta={}, gamma={}\n",
        params.alpha, params.beta, params.gamma
    );
    println!("{}", crate::report::format_error_report(&eval.errors.report()));
    if args.trace {
        println!("{}", crate::report::format_trace(&eval.points));
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = sample_config_from_args(&args);
    let dataset = crate::data::generate_sample(&config)?;

    match &args.output {
        Some(path) => {
            crate::io::export::write_dataset_json(path, &dataset)?;
            log::info!("wrote {} points to {}", dataset.len(), path.display());
        }
        None => println!("{}", crate::io::export::dataset_to_json(&dataset)?),
    }
    Ok(())
}

fn handle_show(args: InputArgs) -> Result<(), AppError> {
    let dataset = load_inputs(&args)?;
    println!("{}", crate::report::format_dataset(&dataset));
    Ok(())
}

fn load_inputs(args: &InputArgs) -> Result<crate::domain::DataSet, AppError> {
    pipeline::load_dataset(&args.inputs, args.format, args.seconds, args.limit)
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        inputs: args.input.inputs.clone(),
        format: args.input.format,
        seconds: args.input.seconds,
        limit: args.input.limit,
        initial_params: args.params.to_params(),
        init_mode: args.init,
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        trace: args.trace,
        top_n: args.top,
        export_summary: args.export_summary.clone(),
        export_points: args.export_points.clone(),
    }
}

pub fn sample_config_from_args(args: &SimulateArgs) -> SampleConfig {
    SampleConfig {
        params: args.params.to_params(),
        count: args.count,
        seed: args.seed,
        input_tokens: args.input_tokens,
        output_tokens: args.output_tokens,
        token_jitter: args.token_jitter,
        max_load: args.max_load,
        noise: args.noise,
        max_batch_size: args.max_batch_size,
        max_num_tokens: args.max_num_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InitMode, InputFormat};

    #[test]
    fn fit_args_resolve_into_config() {
        let cli = Cli::try_parse_from([
            "latfit",
            "fit",
            "bench.html",
            "--format",
            "guidellm-html",
            "--seconds",
            "--gamma",
            "0.0001",
            "--init",
            "auto",
            "--top",
            "3",
            "--export-summary",
            "out.json",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };

        let config = fit_config_from_args(&args);
        assert_eq!(config.inputs, vec!["bench.html"]);
        assert_eq!(config.format, InputFormat::GuidellmHtml);
        assert!(config.seconds);
        assert_eq!(config.initial_params.gamma, 1e-4);
        assert_eq!(config.init_mode, InitMode::Auto);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.export_summary.as_deref(), Some(std::path::Path::new("out.json")));
        assert!(config.export_points.is_none());
    }

    #[test]
    fn simulate_args_resolve_into_sample_config() {
        let cli = Cli::try_parse_from(["latfit", "simulate", "--alpha", "6", "--seed", "9", "--noise", "0"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let config = sample_config_from_args(&args);
        assert_eq!(config.params.alpha, 6.0);
        assert_eq!(config.seed, 9);
        assert_eq!(config.noise, 0.0);
        assert!(crate::data::generate_sample(&config).is_ok());
    }
}
