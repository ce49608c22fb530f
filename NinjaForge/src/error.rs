//! Error types for `NinjaForge`

use thiserror::Error;

/// The error type for `NinjaForge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Cursor Errors ====================
    /// A read needed more bytes than remain in the buffer.
    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {remaining})")]
    UnexpectedEof {
        /// Byte offset where the read was attempted.
        offset: usize,
        /// Requested bytes.
        need: usize,
        /// Bytes still available.
        remaining: usize,
    },

    /// A seek targeted a position past the end of the buffer.
    #[error("seek to {target:#x} is outside the buffer (length {len:#x})")]
    SeekOutOfRange {
        /// The requested absolute position.
        target: i64,
        /// Buffer length.
        len: usize,
    },

    // ==================== Malformed Container Errors ====================
    /// The leading magic does not belong to any supported container.
    #[error("unsupported format: magic {magic:02X?}")]
    UnsupportedFormat {
        /// First four bytes of the buffer (or of the container after a pre-header).
        magic: [u8; 4],
    },

    /// A chunk tag inside a recognised container is wrong.
    #[error("invalid chunk at {offset:#x}: expected {expected:?}, found {found:02X?}")]
    InvalidChunkMagic {
        /// Expected chunk tag.
        expected: &'static str,
        /// Tag found in the file.
        found: [u8; 4],
        /// Absolute offset of the tag.
        offset: usize,
    },

    /// An offset field points outside the buffer.
    #[error("offset {offset:#x} is outside the buffer (length {len:#x})")]
    OffsetOutOfRange {
        /// Absolute position the offset resolved to.
        offset: usize,
        /// Buffer length.
        len: usize,
    },

    /// An event record names an opcode outside the known set.
    #[error("unknown event opcode {name:?}")]
    UnknownOpcode {
        /// The opcode name read from (or supplied for) the record.
        name: String,
    },

    /// A face set declares a primitive topology outside the known set.
    #[error("unknown face topology {value}")]
    UnknownTopology {
        /// Raw topology value.
        value: u32,
    },

    /// The declared vertex stride cannot hold the declared vertex layout.
    #[error("vertex stride {stride} is smaller than layout size {layout_size}")]
    StrideTooSmall {
        /// Stride declared in the vertex set.
        stride: u32,
        /// Bytes required by the layout flags.
        layout_size: u32,
    },

    /// A package header or entry is inconsistent.
    #[error("invalid package: {message}")]
    InvalidPackage {
        /// Description of what is invalid.
        message: String,
    },

    // ==================== Unsupported Variants ====================
    /// The container was recognised but this variant is not implemented.
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// Name of the unsupported variant.
        feature: &'static str,
    },

    // ==================== Encode Errors ====================
    /// Strings written to a string table must be ASCII.
    #[error("string {0:?} contains non-ASCII characters")]
    NonAsciiString(String),

    /// Strings are NUL terminated on disk, so they cannot contain one.
    #[error("string {0:?} contains a NUL byte")]
    InteriorNul(String),

    /// An event payload does not match the layout registered for its opcode.
    #[error("payload for {name:?} does not match the {expected} layout")]
    PayloadMismatch {
        /// The opcode name.
        name: String,
        /// Layout the registry expects for that opcode.
        expected: &'static str,
    },

    /// A vertex set's attribute arrays disagree with its vertex count.
    #[error("vertex set {index}: {message}")]
    InvalidVertexSet {
        /// Index of the vertex set within the model.
        index: usize,
        /// Description of the mismatch.
        message: String,
    },

    /// A mesh refers to data that does not exist or cannot be represented.
    #[error("mesh {index}: {message}")]
    InvalidMesh {
        /// Index of the mesh within its model or mesh list.
        index: usize,
        /// Description of the problem.
        message: String,
    },

    /// Re-encoding a decoded asset did not reproduce it.
    #[error("{kind} changed after re-encoding")]
    RoundTripMismatch {
        /// Asset kind that was compared.
        kind: String,
    },

    // ==================== Parsing Errors ====================
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// Which part of a file was malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// Leading magic or chunk tag not recognised.
    BadMagic,
    /// An offset resolves outside the buffer.
    OffsetOutOfRange,
    /// A discriminant (event opcode name) is outside the known set.
    UnknownDiscriminant,
    /// The data ends before a declared count or size is satisfied.
    Truncated,
}

/// Coarse classification of an [`Error`], for callers that log or recover per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input bytes are not a well-formed container.
    MalformedInput(MalformedKind),
    /// The container is recognised but uses a variant this crate does not implement.
    Unsupported,
    /// In-memory data cannot be encoded as given.
    InvalidData,
    /// File system or serialization failure.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnsupportedFormat { .. } | Error::InvalidChunkMagic { .. } => {
                ErrorCategory::MalformedInput(MalformedKind::BadMagic)
            }
            Error::OffsetOutOfRange { .. } | Error::SeekOutOfRange { .. } => {
                ErrorCategory::MalformedInput(MalformedKind::OffsetOutOfRange)
            }
            Error::UnknownOpcode { .. } | Error::UnknownTopology { .. } => {
                ErrorCategory::MalformedInput(MalformedKind::UnknownDiscriminant)
            }
            Error::UnexpectedEof { .. } | Error::StrideTooSmall { .. } | Error::InvalidPackage { .. } => {
                ErrorCategory::MalformedInput(MalformedKind::Truncated)
            }
            Error::NotImplemented { .. } => ErrorCategory::Unsupported,
            Error::NonAsciiString(_)
            | Error::InteriorNul(_)
            | Error::PayloadMismatch { .. }
            | Error::InvalidVertexSet { .. }
            | Error::InvalidMesh { .. }
            | Error::RoundTripMismatch { .. } => ErrorCategory::InvalidData,
            Error::Io(_) | Error::JsonError(_) | Error::WalkDirError(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error means the input bytes are malformed.
    pub fn is_malformed(&self) -> bool {
        matches!(self.category(), ErrorCategory::MalformedInput(_))
    }
}

/// A specialized Result type for `NinjaForge` operations.
pub type Result<T> = std::result::Result<T, Error>;
