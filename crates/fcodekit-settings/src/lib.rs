//! fcodekit Settings Crate
//!
//! Handles conversion settings: output format, toolhead type, estimator
//! tuning and default metadata.

pub mod config;
pub mod error;

pub use config::{Config, EstimatorSettings, OutputFormat, OutputSettings};
pub use error::{ConfigError, ConfigResult};
