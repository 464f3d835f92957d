//! `orryc.toml` configuration: output format and warnings-as-errors.
//!
//! Searched for in the current directory, then the user's home directory,
//! then the system configuration directory; a missing file is not an
//! error, it just means the defaults apply.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DriverError, Result};

pub const CONFIG_FILE_NAME: &str = "orryc.toml";

/// How rendered diagnostics are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// `--> file:line:col` plus an underlined source snippet.
    Human,
    /// One diagnostic per line, `level: message (file:line:col)`.
    Short,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Human
    }
}

/// Driver configuration, loaded from `orryc.toml` and layered under CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Treat warning-level diagnostics as errors for exit-code purposes.
    #[serde(default)]
    pub warnings_as_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            warnings_as_errors: false,
        }
    }
}

impl Config {
    /// Load from the first config file found in the standard search order,
    /// or the defaults if none exists.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. Unlike [`Config::load`], a missing file
    /// here is an error: the user asked for this specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DriverError::ConfigMissing(path.to_path_buf()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| DriverError::SourceRead(path.to_path_buf(), e))?;
        toml::from_str(&content).map_err(|e| DriverError::ConfigParse(path.to_path_buf(), e))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(DriverError::ConfigSerialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    fn check_home_config() -> Option<PathBuf> {
        dirs::home_dir()
            .map(|dir| dir.join(".config").join("orryc").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn check_system_config() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("orryc").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::check_current_dir_config()
            .or_else(Self::check_home_config)
            .or_else(Self::check_system_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_human_and_not_strict() {
        let config = Config::default();
        assert_eq!(config.output_format, OutputFormat::Human);
        assert!(!config.warnings_as_errors);
    }

    #[test]
    fn config_save_and_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orryc.toml");
        let original = Config {
            output_format: OutputFormat::Short,
            warnings_as_errors: true,
        };
        original.save_to_path(&path).unwrap();
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn load_from_missing_path_is_an_error() {
        let result = Config::load_from_path(Path::new("/nonexistent/orryc.toml"));
        assert!(matches!(result, Err(DriverError::ConfigMissing(_))));
    }

    #[test]
    fn load_from_malformed_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orryc.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        let result = Config::load_from_path(&path);
        assert!(matches!(result, Err(DriverError::ConfigParse(_, _))));
    }
}
