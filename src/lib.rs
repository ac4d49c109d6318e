//! # fcodekit
//!
//! Converts G-Code toolpaths into the FCode binary containers read by FLUX
//! machines.
//!
//! ## Architecture
//!
//! fcodekit is organized as a workspace with multiple crates:
//!
//! 1. **fcodekit-core** - Error types and unit helpers
//! 2. **fcodekit-settings** - Output format, estimator tuning, default metadata
//! 3. **fcodekit-toolpath** - G-Code parser, processor contract, FCode V1/V2
//!    writers and readers
//! 4. **fcodekit** - The `g2f` binary that integrates all crates
//!
//! ## Features
//!
//! - **Streaming Parser**: One line at a time, errors reported per line
//! - **FCode V1 and V2**: Checksummed containers with metadata and previews
//! - **Trip Estimation**: Travel distance, time cost and extents in metadata
//! - **G-Code Output**: Normalized G-Code through the same processor contract

pub mod cli;

pub use fcodekit_core::{Error, FcodeError, GcodeError, Result, WriterWarning};
pub use fcodekit_settings::{Config, ConfigError, EstimatorSettings, OutputFormat, OutputSettings};
pub use fcodekit_toolpath::{
    convert, convert_to_fcode, read, ConversionReport, FcodeFile, FcodeV1Writer, FcodeV2Writer,
    GcodeParser, GcodeWriter, Metadata, MotionFlags, ToolpathProcessor,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging for the command line tool
///
/// Sets up structured logging with:
/// - Console output on stderr, so converted G-Code can go to stdout
/// - RUST_LOG environment variable support
/// - `warn` by default, `debug` when `verbose` is set
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
