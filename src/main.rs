//! Main entry point for the `pz` CLI app

use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Log filter variable, e.g. `PZ_LOG=pzip=debug`.
const LOG_ENV: &str = "PZ_LOG";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match pzip::cli_runner::run_cli_app() {
        Ok(code) => code,
        Err(e) => {
            if e.downcast_ref::<clap::Error>().is_none() {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
