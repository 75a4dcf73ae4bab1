//! Errors raised by the buffer layer.

use thiserror::Error;

/// Faults from Buffer operations. Raw stores do not produce errors; every
/// bound is validated here before a store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// An access of `width` bytes at `offset` does not fit in a buffer of
    /// `length` bytes.
    #[error("offset {offset} with width {width} is outside the buffer (length {length})")]
    OutOfRange {
        offset: usize,
        width: usize,
        length: usize,
    },

    /// A slice or text range started at or past the end of the buffer.
    #[error("invalid start position {start} for buffer of length {length}")]
    InvalidStart { start: usize, length: usize },

    /// A range's start exceeded its end.
    #[error("range start {start} exceeds end {end}")]
    StartAfterEnd { start: usize, end: usize },

    /// The named string encoding is not registered.
    #[error("unknown string encoding '{0}'")]
    UnknownEncoding(String),

    /// Text could not be converted under the named encoding.
    #[error("invalid {encoding} input: {reason}")]
    InvalidText {
        encoding: &'static str,
        reason: String,
    },

    /// Integer width outside the supported 1-6 byte range.
    #[error("unsupported integer width {0}")]
    UnsupportedWidth(usize),
}

pub type BufResult<T> = Result<T, BufferError>;
