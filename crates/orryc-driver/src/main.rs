//! `orryc` - command line entry point.
//!
//! Parses arguments, initializes logging, loads configuration, and
//! dispatches to the `check` subcommand.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orryc_driver::config::Config;
use orryc_driver::error::{DriverError, Result};

/// Orrery's semantic checker.
#[derive(Parser, Debug)]
#[command(name = "orryc")]
#[command(author, version, about = "Lex, parse, and semantically check Orrery source files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true, env = "ORRYC_VERBOSE")]
    verbose: bool,

    /// Path to an `orryc.toml` configuration file.
    #[arg(short, long, global = true, env = "ORRYC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check one or more source files for semantic errors.
    Check(CheckCommand),
}

#[derive(Parser, Debug)]
struct CheckCommand {
    /// Source files to check.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check(args) => {
            let any_failures = orryc_driver::run_check(&args.files, &config)?;
            if any_failures {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| DriverError::Logging(e.to_string()))?;

    Ok(())
}

fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_with_single_file() {
        let cli = Cli::parse_from(["orryc", "check", "main.orr"]);
        match cli.command {
            Commands::Check(args) => assert_eq!(args.files, vec![PathBuf::from("main.orr")]),
        }
    }

    #[test]
    fn parses_check_with_multiple_files() {
        let cli = Cli::parse_from(["orryc", "check", "a.orr", "b.orr"]);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.files, vec![PathBuf::from("a.orr"), PathBuf::from("b.orr")])
            }
        }
    }

    #[test]
    fn parses_global_verbose_flag() {
        let cli = Cli::parse_from(["orryc", "--verbose", "check", "main.orr"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parses_global_config_flag() {
        let cli = Cli::parse_from(["orryc", "--config", "orryc.toml", "check", "main.orr"]);
        assert_eq!(cli.config, Some(PathBuf::from("orryc.toml")));
    }
}
