//! Error handling for the `orryc` driver.
//!
//! I/O and configuration failures (missing file, malformed `orryc.toml`) are
//! kept distinct from checker diagnostics: they mean the compiler itself
//! could not run, not that it found a problem in the user's program.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort a driver invocation before or between pipeline phases.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A source file named on the command line could not be read.
    #[error("could not read {0}: {1}")]
    SourceRead(PathBuf, #[source] std::io::Error),

    /// Configuration file exists but is not valid TOML or has an unknown shape.
    #[error("failed to parse configuration {0}: {1}")]
    ConfigParse(PathBuf, #[source] toml::de::Error),

    /// Configuration file was explicitly requested but does not exist.
    #[error("configuration file not found: {0}")]
    ConfigMissing(PathBuf),

    /// Configuration could not be serialized back to TOML.
    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[source] toml::ser::Error),

    /// Generic I/O failure not tied to a specific source file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The logging subsystem was already initialized (double `try_init`).
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
