//! Command-line interface
//!
//! - `ciclo run <config>` - train as the YAML run description says
//! - `ciclo validate <config>` - check a run description without training

mod logging;

pub use logging::{init_tracing, log, LogLevel};

use crate::config::{execute, load_config, RunSpec};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ciclo: callback-driven training policies
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "ciclo")]
#[command(version)]
#[command(about = "Train a reference classifier with one-cycle, LR finder, mixed precision, mixup and clipping")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train from a YAML run description
    Run(RunArgs),

    /// Validate a run description without training
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Path to the YAML run description
    pub config: PathBuf,

    /// Override the number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Override the seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to the YAML run description
    pub config: PathBuf,
}

impl RunArgs {
    fn apply_overrides(&self, spec: &mut RunSpec) {
        if let Some(epochs) = self.epochs {
            spec.training.epochs = epochs;
        }
        if let Some(seed) = self.seed {
            spec.seed = seed;
        }
    }
}

/// Execute a CLI command
pub fn run_command(cli: Cli) -> Result<(), String> {
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);
    init_tracing(level);

    match cli.command {
        Command::Run(args) => {
            let mut spec = load_config(&args.config).map_err(|e| format!("{}: {e}", args.config.display()))?;
            args.apply_overrides(&mut spec);
            log(level, LogLevel::Verbose, &format!("{spec:#?}"));
            let report = execute(&spec).map_err(|e| e.to_string())?;
            log(level, LogLevel::Normal, report.to_string().trim_end());
            Ok(())
        }
        Command::Validate(args) => {
            let spec = load_config(&args.config).map_err(|e| format!("{}: {e}", args.config.display()))?;
            log(level, LogLevel::Normal, &format!("{} is valid", args.config.display()));
            log(
                level,
                LogLevel::Verbose,
                &format!(
                    "  Action: {:?}\n  Epochs: {}\n  Classes: {}\n  Hidden: {:?}",
                    spec.training.action, spec.training.epochs, spec.data.blobs.n_classes, spec.model.hidden
                ),
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["ciclo", "run", "run.yaml", "--epochs", "2", "-v"]).unwrap();
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("run.yaml"));
        assert_eq!(args.epochs, Some(2));

        let mut spec = RunSpec::default();
        args.apply_overrides(&mut spec);
        assert_eq!(spec.training.epochs, 2);
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["ciclo", "-q", "validate", "run.yaml"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Validate(_)));
        assert!(Cli::try_parse_from(["ciclo", "train"]).is_err());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let cli = Cli::try_parse_from(["ciclo", "-q", "validate", "/nonexistent/run.yaml"]).unwrap();
        assert!(run_command(cli).is_err());
    }
}
