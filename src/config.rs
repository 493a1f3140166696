//! Application configuration, read from a JSON file next to the working directory.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "irp_dashboard.json";
/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "IRP_DASHBOARD_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Returns sheet opened at startup when no file has been uploaded.
    pub returns_path: PathBuf,
    /// Fee sheet, always read from this local path.
    pub fee_path: PathBuf,
    /// Zero-based header row of the returns sheet.
    pub returns_header_row: usize,
    /// Zero-based header row of the fee sheet.
    pub fee_header_row: usize,
    /// Number of labelled points in the net efficiency scatter.
    pub top_n: usize,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            returns_path: PathBuf::from("2025-1 IRP 수익률.xlsx"),
            fee_path: PathBuf::from("2025-1 IRP 수수료.xlsx"),
            returns_header_row: 7,
            fee_header_row: 8,
            top_n: 5,
            window_width: 1400.0,
            window_height: 900.0,
        }
    }
}

impl AppConfig {
    /// Resolve the config path from the environment, falling back to [`CONFIG_FILE`].
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.returns_header_row, 7);
        assert_eq!(config.fee_header_row, 8);
        assert_eq!(config.top_n, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "fee_path": "fees.csv", "top_n": 3 }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.fee_path, PathBuf::from("fees.csv"));
        assert_eq!(config.top_n, 3);
        assert_eq!(config.returns_header_row, 7);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ top_n: }").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
