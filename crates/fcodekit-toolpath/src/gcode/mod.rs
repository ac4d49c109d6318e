//! G-Code side of the toolpath pipeline
//!
//! - `parser`: line parser with modal state
//! - `processor`: the event contract every backend implements
//! - `writer`: normalized G-Code output backend

pub mod flags;
pub mod parser;
pub mod processor;
pub mod writer;

pub use flags::MotionFlags;
pub use parser::{GcodeParser, ParserState, TOOL_COUNT};
pub use processor::{OneSegmentType, ToolpathProcessor};
pub use writer::GcodeWriter;
