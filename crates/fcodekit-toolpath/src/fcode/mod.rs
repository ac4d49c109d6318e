//! FCode binary containers
//!
//! Both container versions share the script opcode encoding
//! ([`script::ScriptEncoder`]) and the trip bookkeeping
//! ([`state::TripState`]); they differ in framing only.

pub mod checksum;
pub mod estimator;
pub mod metadata;
pub mod opcode;
pub mod reader;
pub mod script;
pub mod state;
pub mod stream;
pub mod v1;
pub mod v2;

pub use checksum::Crc32;
pub use metadata::Metadata;
pub use reader::{
    decode_script, read, read_v1, read_v2, FcodeFile, FcodeV1File, FcodeV2File, ScriptCommand,
};
pub use state::TripState;
pub use stream::{FcodeStream, Marker};
pub use v1::FcodeV1Writer;
pub use v2::{FcodeV2Writer, TaskSummary};
