//! # fcodekit toolpath
//!
//! Streaming G-Code parser, the [`ToolpathProcessor`] event contract and its
//! backends: the FCode V1 and V2 binary writers and a normalized G-Code
//! re-writer. Also decodes FCode containers back into scripts.
//!
//! ```no_run
//! use std::io::Cursor;
//! use fcodekit_toolpath::{convert, FcodeV2Writer};
//!
//! let mut writer = FcodeV2Writer::new(Cursor::new(Vec::new()))?;
//! convert("G1 F3000 X10 Y10\n".as_bytes(), &mut writer)?;
//! let _container = writer.into_inner().into_inner();
//! # Ok::<(), fcodekit_core::Error>(())
//! ```

pub mod convert;
pub mod fcode;
pub mod gcode;

pub use convert::{convert, convert_to_fcode, ConversionReport};
pub use fcode::{
    decode_script, read, read_v1, read_v2, Crc32, FcodeFile, FcodeV1File, FcodeV1Writer,
    FcodeV2File, FcodeV2Writer, Metadata, ScriptCommand, TaskSummary, TripState,
};
pub use gcode::{
    GcodeParser, GcodeWriter, MotionFlags, OneSegmentType, ParserState, ToolpathProcessor,
};
