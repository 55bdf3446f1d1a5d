//! Error types for resptap
//!
//! `FrameError` covers stream-fatal protocol faults raised by the framer.
//! `TapError` is the unified error for everything else.

use thiserror::Error;

/// Result type alias using TapError
pub type Result<T> = std::result::Result<T, TapError>;

/// Unified error type for resptap operations
#[derive(Debug, Error)]
pub enum TapError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Frame(#[from] FrameError),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Header field carrying a length token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    /// `$<len>` of a bulk string
    BulkLength,
    /// `*<count>` of an array
    ArrayCount,
}

impl std::fmt::Display for LengthField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthField::BulkLength => f.write_str("bulk string length"),
            LengthField::ArrayCount => f.write_str("array element count"),
        }
    }
}

/// Protocol fault that makes a stream unrecoverable.
///
/// The framer cannot resynchronize after any of these, so the owning
/// connection is expected to be closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("unknown type byte 0x{byte:02x}")]
    UnknownType { byte: u8 },

    #[error("invalid {field}: {token:?}")]
    InvalidLength { field: LengthField, token: String },

    #[error("bulk string payload not terminated by CRLF")]
    MissingTerminator,

    #[error("array nesting deeper than {limit}")]
    NestingTooDeep { limit: usize },

    #[error("pending buffer would hold {pending} bytes (limit {limit})")]
    BufferOverflow { pending: usize, limit: usize },
}
