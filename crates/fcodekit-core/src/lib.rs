//! # fcodekit Core
//!
//! Error types and unit helpers shared by the fcodekit crates.
//! The toolpath pipeline and settings crates build on these.

pub mod error;
pub mod units;

pub use error::{Error, FcodeError, GcodeError, Result, WriterWarning};
pub use units::{inch_to_mm, mm_per_min_to_mm_per_sec, MeasurementSystem};
