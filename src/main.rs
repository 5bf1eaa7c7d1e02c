//! Ciclo CLI
//!
//! # Usage
//!
//! ```bash
//! # Train as described by a run file
//! ciclo run run.yaml
//!
//! # Train with overrides
//! ciclo run run.yaml --epochs 10 --seed 3
//!
//! # Validate a run file
//! ciclo validate run.yaml
//! ```

use ciclo::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
