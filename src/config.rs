//! Runtime configuration
//!
//! Read from environment variables, falling back to local-development
//! defaults. On a server the variables come from the service unit.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory holding the records CSV and model artifacts
pub const DEFAULT_DATA_DIR: &str = "data";

/// Locations of the artifacts the engine is built from
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub records_file: String,
    pub model_file: String,
    pub columns_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            records_file: "final_training_data.csv".to_string(),
            model_file: "crop_yield_model.json".to_string(),
            columns_file: "model_columns.json".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build from `DATA_DIR`, `RECORDS_FILE`, `MODEL_FILE`, `COLUMNS_FILE`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            records_file: std::env::var("RECORDS_FILE").unwrap_or(defaults.records_file),
            model_file: std::env::var("MODEL_FILE").unwrap_or(defaults.model_file),
            columns_file: std::env::var("COLUMNS_FILE").unwrap_or(defaults.columns_file),
        }
    }

    /// Use a different data directory, keeping file names
    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join(&self.records_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }

    pub fn columns_path(&self) -> PathBuf {
        self.data_dir.join(&self.columns_file)
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Upper bound on one optimization scan
    pub optimize_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            optimize_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Build from `PORT` and `OPTIMIZE_TIMEOUT_SECS`; unparseable values keep defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let optimize_timeout = std::env::var("OPTIMIZE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.optimize_timeout);

        Self { port, optimize_timeout }
    }
}
