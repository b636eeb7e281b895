use thiserror::Error;

/// Error types for micro3D figure decoding and posing
#[derive(Error, Debug)]
pub enum Mc3Error {
    /// Invalid magic bytes in the file header
    #[error("invalid magic: expected '{expected}', got '{actual}'")]
    InvalidMagic {
        expected: &'static str,
        actual: String,
    },

    /// A read ran past the end of the input buffer; always fatal to the decode
    #[error("truncated input: needed {needed} more byte(s), {available} available")]
    Truncated { needed: usize, available: usize },

    /// Unsupported file version byte
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// Recognized but unimplemented section sub-format
    #[error("unsupported {kind} sub-format: {value}")]
    UnsupportedSubFormat { kind: &'static str, value: u8 },

    /// Recognized but unimplemented bone motion type
    #[error("unsupported motion type: {0}")]
    UnsupportedMotionType(u8),

    /// A count, index, or field exceeds a structural bound of the format
    #[error("value out of range: {0}")]
    Range(String),

    /// Structurally inconsistent data that fits no narrower category
    #[error("format error: {0}")]
    Format(String),

    /// Caller misuse: out-of-range action/pattern/texture index or similar
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation on a released object
    #[error("{0} has been disposed")]
    Disposed(&'static str),
}

/// Result type using Mc3Error
pub type Result<T> = std::result::Result<T, Mc3Error>;
