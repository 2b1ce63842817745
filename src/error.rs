use std::fmt;
use std::io;
use thiserror::Error;

/// Human-readable strings for every decoder outcome, indexed by
/// [`InflateError::code`]. Index 0 is the success case.
pub const ERROR_STRINGS: [&str; 10] = [
    "Success",
    "Unexpected end of file",
    "Uncompressed file too large",
    "GZIP ID mismatch",
    "Checksum mismatch",
    "Block LEN/NLEN mismatch",
    "Invalid Huffman tree",
    "Invalid bit sequence",
    "Distance out of range",
    "Invalid block type",
];

/// Every way a gzip or DEFLATE decode can fail.
///
/// The set is closed: sub-operations return one of these kinds and callers
/// propagate it unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InflateError {
    /// Input ran out before a field or the declared output was complete.
    #[error("{}", ERROR_STRINGS[1])]
    EndOfFile,

    /// A write would pass the end of the output buffer.
    #[error("{}", ERROR_STRINGS[2])]
    Overflow,

    /// The first two bytes are not the gzip magic.
    #[error("{}", ERROR_STRINGS[3])]
    IdMismatch,

    /// Header CRC16 or trailer CRC-32 disagrees with the computed value.
    #[error("{}", ERROR_STRINGS[4])]
    CrcMismatch,

    /// Stored block LEN is not the complement of NLEN.
    #[error("{}", ERROR_STRINGS[5])]
    LenMismatch,

    /// A code length table does not describe a prefix code.
    #[error("{}", ERROR_STRINGS[6])]
    TreeInvalid,

    /// A decoded symbol is outside its alphabet.
    #[error("{}", ERROR_STRINGS[7])]
    CodeInvalid,

    /// A back-reference reaches before the start of the output.
    #[error("{}", ERROR_STRINGS[8])]
    DistInvalid,

    /// Block type 0b11.
    #[error("{}", ERROR_STRINGS[9])]
    TypeInvalid,
}

impl InflateError {
    /// Index of this error in [`ERROR_STRINGS`].
    pub fn code(self) -> usize {
        match self {
            InflateError::EndOfFile => 1,
            InflateError::Overflow => 2,
            InflateError::IdMismatch => 3,
            InflateError::CrcMismatch => 4,
            InflateError::LenMismatch => 5,
            InflateError::TreeInvalid => 6,
            InflateError::CodeInvalid => 7,
            InflateError::DistInvalid => 8,
            InflateError::TypeInvalid => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        ERROR_STRINGS[self.code()]
    }
}

pub type InflateResult<T> = Result<T, InflateError>;

/// Which part of a gzip file was being read when decoding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    Data,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Header => write!(f, "GZIP header corrupt"),
            Stage::Data => write!(f, "Compressed data corrupt"),
        }
    }
}

/// Errors surfaced by the command line tool.
#[derive(Error, Debug)]
pub enum GzError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{stage}: {source}")]
    Corrupt {
        stage: Stage,
        #[source]
        source: InflateError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl GzError {
    pub fn header(source: InflateError) -> Self {
        GzError::Corrupt {
            stage: Stage::Header,
            source,
        }
    }

    pub fn data(source: InflateError) -> Self {
        GzError::Corrupt {
            stage: Stage::Data,
            source,
        }
    }

    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        GzError::InvalidArgument(msg.to_string())
    }

    pub fn thread<T: fmt::Display>(msg: T) -> Self {
        GzError::Thread(msg.to_string())
    }
}

pub type GzResult<T> = Result<T, GzError>;
