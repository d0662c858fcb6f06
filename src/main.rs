//! doxy2json - Doxygen configuration and XML output to JSON data files and
//! Markdown pages for static site generators.

mod build;
mod cli;
mod config;
mod index;
mod logger;
mod output;
mod transform;
mod utils;

use build::BuildError;
use clap::Parser;
use cli::Cli;
use config::RunConfig;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match build::run(RunConfig::from_cli(&cli)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            logger::error(&format!("{err:#}"));
            exit_code(&err)
        }
    }
}

/// Forward the generator's exit code; every other failure exits with 1.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<BuildError>()
        .map_or(ExitCode::FAILURE, |err| ExitCode::from(err.exit_code()))
}
