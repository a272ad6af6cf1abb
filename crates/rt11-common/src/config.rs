//! Configuration types for rt11dir
//!
//! Every field has a default, so an empty or partial TOML file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for rt11dir
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// File transfer defaults
    pub transfer: TransferConfig,
    /// Defaults for newly formatted volumes
    pub format: FormatConfig,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// File transfer defaults
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Never overwrite existing destination files
    pub no_replace: bool,
    /// Date stamped on files copied onto a volume (`dd-MMM-yy`); today if unset
    pub date: Option<String>,
}

/// Defaults for newly formatted volumes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Number of directory segment slots (1-31)
    pub total_segments: u16,
    /// Extra bytes appended to every directory entry
    pub extra_bytes: u16,
    /// Block holding directory segment 1
    pub first_dir_block: u16,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            total_segments: 4,
            extra_bytes: 0,
            first_dir_block: 6,
        }
    }
}
