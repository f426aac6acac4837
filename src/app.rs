//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initializes logging
//! - loads the series and the fit configuration
//! - runs the fit / seed / simulate pipeline
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, SeedArgs, SimulateArgs};
use crate::config::load_config;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Seed(args) => handle_seed(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = load_config(args.config.as_deref(), &args.overrides())?;
    let loaded = pipeline::load_input(&args.input)?;
    let result = pipeline::run_fit(loaded, args.start, &args.label, &config)?;

    println!("{}", crate::report::format::format_fit_summary(&result));

    if let Some(path) = &args.export_json {
        crate::io::export::write_result_json(path, &result)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::export::write_trajectory_csv(path, &result)?;
    }
    Ok(())
}

fn handle_seed(args: SeedArgs) -> Result<(), AppError> {
    let loaded = pipeline::load_input(&args.input)?;
    let seed = pipeline::run_seed(&loaded.values)?;
    println!("{}", crate::report::format::format_seed(&seed));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let values = pipeline::run_simulate(&args)?;
    print!("{}", crate::report::format::format_series(&values));
    Ok(())
}
