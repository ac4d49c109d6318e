//! Conversion settings for fcodekit
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML files, selected by extension.
//!
//! Configuration is organized into logical sections:
//! - Output settings (container format, toolhead type)
//! - Estimator settings (axis accelerations, vertical speed)
//! - Default metadata appended to every container

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// FCode container version 1
    V1,
    /// FCode container version 2
    #[default]
    V2,
    /// Normalized G-Code text
    Gcode,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
            Self::Gcode => write!(f, "gcode"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" | "fcode1" => Ok(Self::V1),
            "v2" | "fcode2" | "fcode" => Ok(Self::V2),
            "gcode" | "g" => Ok(Self::Gcode),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Backend the program is converted to
    pub format: OutputFormat,
    /// Toolhead type recorded in V1 metadata (`HEAD_TYPE`)
    pub head_type: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::V2,
            head_type: "LASER".to_string(),
        }
    }
}

/// Kinematic estimator tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    /// X axis acceleration in mm/s²
    pub acc_x: f32,
    /// Y axis acceleration in mm/s²
    pub acc_y: f32,
    /// Nominal speed of vertical (Z) moves in mm/s
    pub z_speed: f32,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            acc_x: 4000.0,
            acc_y: 2000.0,
            z_speed: 7.5,
        }
    }
}

/// Complete conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Metadata pairs appended after the computed keys, in order
    pub metadata: Vec<(String, String)>,
    /// Output settings
    pub output: OutputSettings,
    /// Estimator settings
    pub estimator: EstimatorSettings,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("estimator.acc_x", self.estimator.acc_x),
            ("estimator.acc_y", self.estimator.acc_y),
            ("estimator.z_speed", self.estimator.z_speed),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::ValueOutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.output.head_type.trim().is_empty() {
            return Err(ConfigError::ValueOutOfRange {
                key: "output.head_type".to_string(),
                value: String::new(),
            });
        }

        Ok(())
    }

    /// Append a `KEY=VALUE` metadata entry
    pub fn push_metadata_entry(&mut self, entry: &str) -> ConfigResult<()> {
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                self.metadata.push((key.to_string(), value.to_string()));
                Ok(())
            }
            _ => Err(ConfigError::InvalidMetadata(entry.to_string())),
        }
    }
}
