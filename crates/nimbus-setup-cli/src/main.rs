//! # nimbus-configure
//!
//! First-run configuration for a Nimbus installation. Exit status 42 tells
//! the wrapper script that a full setup completed.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cli;
mod run;

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use nimbus_setup_common::constants::exit;

use crate::cli::Cli;

fn init_logging(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
    tracing::debug!("debug enabled");
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
fn main() -> ExitCode {
    if !cfg!(unix) {
        eprintln!("\nERROR: Only runs on POSIX systems.");
        return ExitCode::from(exit::INCOMPATIBLE_ENVIRONMENT);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::from(exit::OK),
                _ => ExitCode::from(exit::INVALID_INPUT),
            };
        }
    };

    init_logging(cli.debug);

    if let Err(e) = ctrlc::set_handler(|| {
        println!("\n\nReceived keyboard interrupt. Aborting!\n");
        std::process::exit(i32::from(exit::INTERRUPTED));
    }) {
        tracing::warn!(error = %e, "failed to set Ctrl+C handler");
    }

    let code = match run::execute(&cli) {
        Ok(code) => code,
        Err(err) => run::report(&err, cli.debug),
    };
    ExitCode::from(code)
}
