//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! tide-overlay.toml file. It tells the core where the station index lives
//! and how to run the external tide predictor.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tide-overlay.toml";

/// Application configuration loaded from tide-overlay.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Station directory configuration
    pub stations: StationsConfig,
    /// External predictor configuration
    pub oracle: OracleConfig,
}

/// Station directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationsConfig {
    /// JSON station index (name, id and position of every station)
    pub index: PathBuf,
}

/// External tide predictor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    /// Predictor executable, e.g. the `tide` program shipped with XTide
    pub program: PathBuf,
    /// Harmonics file handed to the predictor via its environment
    pub harmonics_file: PathBuf,
    /// Upper bound on a single predictor run, in seconds
    pub timeout_secs: u64,
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stations: StationsConfig {
                index: PathBuf::from("stations.json"),
            },
            oracle: OracleConfig {
                program: PathBuf::from("tide"),
                harmonics_file: PathBuf::from("harmonics-dwf-20091227-nonfree.tcd"),
                timeout_secs: 30,
            },
        }
    }
}

impl Config {
    /// Load configuration from tide-overlay.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stations.index, PathBuf::from("stations.json"));
        assert_eq!(config.oracle.program, PathBuf::from("tide"));
        assert_eq!(config.oracle.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.oracle.harmonics_file, parsed.oracle.harmonics_file);
        assert_eq!(config.stations.index, parsed.stations.index);
    }

    #[test]
    fn test_load_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"
[stations]
index = "/data/uk.json"

[oracle]
program = "/opt/xtide/tide"
harmonics_file = "/data/uk.tcd"
timeout_secs = 5
"#,
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.stations.index, PathBuf::from("/data/uk.json"));
        assert_eq!(config.oracle.program, PathBuf::from("/opt/xtide/tide"));
        assert_eq!(config.oracle.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "this is = not [valid").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.oracle.timeout_secs, 30);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        assert_eq!(config.oracle.program, PathBuf::from("tide"));
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.oracle.timeout_secs = 12;
        config.save(file.path()).unwrap();
        assert_eq!(Config::load_from_path(file.path()).oracle.timeout_secs, 12);
    }
}
