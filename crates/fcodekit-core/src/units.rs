//! Unit conversion utilities
//!
//! G-Code programs may be written in inches (G20) or millimeters (G21) and
//! express feedrates per minute. Everything downstream of the parser works in
//! millimeters and millimeters per second.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Measurement system selected by G20/G21
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSystem {
    /// Metric system (mm)
    #[default]
    Metric,
    /// Imperial system (inches)
    Imperial,
}

impl MeasurementSystem {
    /// Convert a value expressed in this system to millimeters
    pub fn to_mm(self, value: f32) -> f32 {
        match self {
            Self::Metric => value,
            Self::Imperial => inch_to_mm(value),
        }
    }
}

impl fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "Metric"),
            Self::Imperial => write!(f, "Imperial"),
        }
    }
}

impl FromStr for MeasurementSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "mm" => Ok(Self::Metric),
            "imperial" | "inch" | "in" => Ok(Self::Imperial),
            _ => Err(format!("Unknown measurement system: {}", s)),
        }
    }
}

/// Convert inches to millimeters
pub fn inch_to_mm(value: f32) -> f32 {
    value * MM_PER_INCH
}

/// Convert a G-Code feedrate (mm/min) to the mm/s used by the estimator
pub fn mm_per_min_to_mm_per_sec(value: f32) -> f32 {
    value / 60.0
}
