//! Whole-program conversion
//!
//! Binds a [`GcodeParser`] to a backend, feeds it every input line and
//! finalizes the backend.

use std::io::{BufRead, Seek, Write};

use fcodekit_core::Result;
use fcodekit_settings::{Config, OutputFormat};

use crate::fcode::{FcodeV1Writer, FcodeV2Writer, Metadata, TaskSummary};
use crate::gcode::{GcodeParser, GcodeWriter, ParserState, ToolpathProcessor};

/// Outcome of a conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    /// Input lines read
    pub lines: usize,
    /// `ERROR ...` / `WARNING ...` strings recorded by the backend
    pub errors: Vec<String>,
    /// Metadata written into the container; empty for G-Code output
    pub metadata: Metadata,
    /// Task blocks closed (V2 only)
    pub tasks: Vec<TaskSummary>,
    /// mm
    pub traveled: f64,
    /// seconds
    pub time_cost: f64,
}

impl ConversionReport {
    /// Whether any critical error was recorded
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.starts_with("ERROR"))
    }
}

/// Parse every line of `input` into `processor`, then finalize it
///
/// Returns the parser state after the last line.
pub fn convert<R: BufRead>(input: R, processor: &mut dyn ToolpathProcessor) -> Result<ParserState> {
    let mut parser = GcodeParser::new(processor);
    let lines = parser.parse_reader(input)?;
    let state = parser.state().clone();
    parser.processor().terminated();
    tracing::debug!(lines, "conversion finished");
    Ok(state)
}

fn parse_into<R: BufRead>(
    input: R,
    processor: &mut dyn ToolpathProcessor,
) -> Result<(usize, ParserState)> {
    let mut parser = GcodeParser::new(processor);
    let lines = parser.parse_reader(input)?;
    Ok((lines, parser.state().clone()))
}

/// Convert `input` into `output` in the format selected by `config`
///
/// Config metadata is written after any pairs already in `metadata`.
pub fn convert_to_fcode<R, W>(
    input: R,
    output: W,
    config: &Config,
    metadata: Metadata,
    previews: Vec<Vec<u8>>,
) -> Result<ConversionReport>
where
    R: BufRead,
    W: Write + Seek,
{
    let mut metadata = metadata;
    metadata.extend(&Metadata::from(config.metadata.clone()));

    let report = match config.output.format {
        OutputFormat::V1 => {
            let mut writer = FcodeV1Writer::new(output, config.output.head_type.as_str())?
                .with_estimator(&config.estimator)
                .with_metadata(metadata)
                .with_previews(previews);
            let (lines, state) = parse_into(input, &mut writer)?;
            writer.set_filament_used(&state.filament);
            writer.terminated();
            ConversionReport {
                lines,
                errors: writer.errors().to_vec(),
                metadata: writer.metadata().clone(),
                tasks: Vec::new(),
                traveled: writer.trip().traveled(),
                time_cost: writer.trip().time_cost(),
            }
        }
        OutputFormat::V2 => {
            let mut writer = FcodeV2Writer::new(output)?
                .with_estimator(&config.estimator)
                .with_metadata(metadata)
                .with_previews(previews);
            let (lines, _) = parse_into(input, &mut writer)?;
            writer.terminated();
            ConversionReport {
                lines,
                errors: writer.errors().to_vec(),
                metadata: writer.metadata().clone(),
                tasks: writer.tasks().to_vec(),
                traveled: writer.trip().traveled(),
                time_cost: writer.trip().time_cost(),
            }
        }
        OutputFormat::Gcode => {
            let mut writer = GcodeWriter::new(output);
            let (lines, _) = parse_into(input, &mut writer)?;
            writer.terminated();
            ConversionReport {
                lines,
                errors: writer.errors().to_vec(),
                ..ConversionReport::default()
            }
        }
    };

    tracing::debug!(
        format = %config.output.format,
        lines = report.lines,
        traveled = report.traveled,
        time_cost = report.time_cost,
        errors = report.errors.len(),
        "conversion finished"
    );
    Ok(report)
}
