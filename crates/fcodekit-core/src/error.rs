//! Error handling for fcodekit
//!
//! Provides error types for all layers of the toolpath pipeline:
//! - G-Code errors (reported line by line through the processor contract)
//! - Writer warnings (recorded by the binary backends, never fatal)
//! - FCode errors (container construction, I/O and decoding)
//!
//! All error types use `thiserror`. The `Display` output of [`GcodeError`] and
//! [`WriterWarning`] is the exact text handed to `on_error`, so it stays in the
//! upper-case mnemonic form the controllers log.

use thiserror::Error;

/// G-Code error type
///
/// Raised by the parser for a single line. Parsing always continues with the
/// next line; the error only decides what is reported and how severely.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// Unknown command prefix or command number
    #[error("BAD_COMMAND {line}")]
    BadCommand {
        /// The offending line, without its terminator.
        line: String,
    },

    /// A parameter letter without a usable value, or a letter the command
    /// does not accept
    #[error("BAD_PARAM {line}")]
    BadParam {
        /// The offending line, without its terminator.
        line: String,
        /// Whether the rest of the line had to be abandoned.
        fatal_to_line: bool,
    },

    /// G4, M104/M109, M106 or X2 without the letter that carries its value
    #[error("BAD_COMMAND {line}")]
    MissingParam {
        /// The offending line, without its terminator.
        line: String,
    },

    /// The same parameter letter appeared twice on one line
    #[error("DUPLICATE_{letter}")]
    DuplicateParam {
        /// The repeated parameter letter.
        letter: char,
    },

    /// G28 does not take parameters; they were dropped
    #[error("G28_PARAM_IGNORED {line}")]
    HomeParamIgnored {
        /// The offending line, without its terminator.
        line: String,
    },
}

impl GcodeError {
    /// Whether the error is reported as critical through the contract.
    pub fn is_critical(&self) -> bool {
        match self {
            GcodeError::BadCommand { .. } => true,
            GcodeError::BadParam { fatal_to_line, .. } => *fatal_to_line,
            GcodeError::MissingParam { .. }
            | GcodeError::DuplicateParam { .. }
            | GcodeError::HomeParamIgnored { .. } => false,
        }
    }
}

/// Non-fatal conditions recorded by the FCode writers
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterWarning {
    /// A move covered XY distance without any positive feedrate on record
    #[error("BAD_FEEDRATE")]
    BadFeedrate,

    /// A move target on the given axis overflowed to a non-finite value
    #[error("BAD_PARAM {0}")]
    NonFiniteTarget(char),

    /// The backend cannot express the requested operation
    #[error("NOT_SUPPORT {0}")]
    NotSupported(&'static str),

    /// `end_task_script_block` was called with no block open
    #[error("TASK_BLOCK_NOT_OPEN")]
    TaskBlockNotOpen,

    /// Content was sealed while task blocks were still open
    #[error("TASK_BLOCK_NOT_CLOSED {0}")]
    TaskBlockNotClosed(usize),
}

/// FCode container error type
///
/// Fatal errors raised while constructing a writer, and decoding errors raised
/// by the container reader.
#[derive(Error, Debug)]
pub enum FcodeError {
    /// The destination file could not be created
    #[error("OPEN FILE ERROR {path}: {source}")]
    Open {
        /// The path that failed to open.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The destination cannot report or change its position
    #[error("NOT_SUPPORT STREAM: {0}")]
    NotSeekable(#[source] std::io::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container does not start with a known magic header
    #[error("Bad magic header: {0:?}")]
    BadMagic(Vec<u8>),

    /// The container ended inside a block
    #[error("Truncated container while reading {what}")]
    Truncated {
        /// The structure being read when the data ran out.
        what: &'static str,
    },

    /// A block trailer does not match the checksum of its payload
    #[error("Checksum mismatch in {block}: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Name of the block.
        block: &'static str,
        /// The checksum found in the trailer.
        stored: u32,
        /// The checksum computed over the payload.
        computed: u32,
    },

    /// A V2 block tag was not recognized
    #[error("Unknown block tag {0:?}")]
    UnknownTag(String),

    /// A script opcode could not be decoded
    #[error("Unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode {
        /// The opcode byte.
        opcode: u8,
        /// Offset of the opcode within the script.
        offset: usize,
    },

    /// Metadata could not be decoded
    #[error("Bad metadata: {0}")]
    BadMetadata(String),

    /// JSON metadata error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main error type for fcodekit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// FCode container error
    #[error(transparent)]
    Fcode(#[from] FcodeError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is an FCode container error
    pub fn is_fcode_error(&self) -> bool {
        matches!(self, Error::Fcode(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_error_display() {
        let err = GcodeError::BadCommand {
            line: "G5 X1".to_string(),
        };
        assert_eq!(err.to_string(), "BAD_COMMAND G5 X1");
        assert!(err.is_critical());

        let err = GcodeError::DuplicateParam { letter: 'F' };
        assert_eq!(err.to_string(), "DUPLICATE_F");
        assert!(!err.is_critical());

        let err = GcodeError::MissingParam {
            line: "M104".to_string(),
        };
        assert_eq!(err.to_string(), "BAD_COMMAND M104");
        assert!(!err.is_critical());
    }

    #[test]
    fn test_bad_param_severity() {
        let abandoned = GcodeError::BadParam {
            line: "G1 X".to_string(),
            fatal_to_line: true,
        };
        let skipped = GcodeError::BadParam {
            line: "G1 Q1".to_string(),
            fatal_to_line: false,
        };
        assert!(abandoned.is_critical());
        assert!(!skipped.is_critical());
        assert_eq!(skipped.to_string(), "BAD_PARAM G1 Q1");
    }

    #[test]
    fn test_writer_warning_display() {
        assert_eq!(WriterWarning::BadFeedrate.to_string(), "BAD_FEEDRATE");
        assert_eq!(
            WriterWarning::NotSupported("ENABLE_MOTOR").to_string(),
            "NOT_SUPPORT ENABLE_MOTOR"
        );
        assert_eq!(WriterWarning::NonFiniteTarget('X').to_string(), "BAD_PARAM X");
    }

    #[test]
    fn test_error_conversion() {
        let err = Error::other("preview missing");
        assert!(!err.is_fcode_error());
        assert_eq!(err.to_string(), "preview missing");

        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: Error = FcodeError::from(io_err).into();
        assert!(err.is_fcode_error());
    }
}
