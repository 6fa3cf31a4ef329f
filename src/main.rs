//! # movies-etl entry point
//!
//! ```bash
//! movies-etl run                       # defaults: IMDb URLs -> resultados.csv
//! movies-etl run --config etl.json     # explicit configuration
//! movies-etl config --output etl.json  # dump the defaults for editing
//! ```
//!
//! A scheduler only needs the exit code: 0 when the summary was written,
//! non-zero when any stage failed.

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use clap::Parser as _;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    if let Err(e) = movies_etl::logging::init() {
        // Console output still works without the file appenders.
        let _ = tracing_subscriber::fmt().with_target(true).try_init();
        tracing::warn!("File logging unavailable: {e:#}");
    }

    match cli::run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Run failed: {e:#}");
            if let Ok(path) = movies_etl::logging::get_current_log_path() {
                tracing::error!("See {} for the full run log", path.display());
            }
            ExitCode::FAILURE
        }
    }
}
