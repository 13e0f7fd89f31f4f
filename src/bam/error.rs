//! Record decoding error types.
//!
//! Every variant is structural: the declared record geometry and the
//! bytes present disagree, and the record cannot be produced. Soft
//! conditions (malformed trailing tags, validator findings) are not
//! errors and never appear here.

use std::io;
use thiserror::Error;

/// Errors that can occur while decoding a binary alignment record.
///
/// Variants carry the offset within the record slice and the declared vs.
/// actual quantities, so a caller can point at the corrupt bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordDecodeError {
    /// The declared record length is below the 32-byte fixed section.
    #[error("record too short: {length} bytes (fixed fields need 32)")]
    TooShort {
        /// The declared record length.
        length: usize,
    },

    /// A field extends past the declared record length.
    #[error("record truncated reading {field} at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        /// Which field was being read.
        field: &'static str,
        /// Offset within the record slice.
        offset: usize,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes remaining in the slice.
        available: usize,
    },

    /// The read-name length field is zero (must be in `[1, 255]`).
    #[error("read name length is zero at offset {offset}")]
    ZeroReadNameLength {
        /// Offset of the length byte.
        offset: usize,
    },

    /// No NUL terminator inside the declared read-name field.
    #[error("read name not NUL-terminated within {length} bytes at offset {offset}")]
    MissingNulTerminator {
        /// Offset of the name field.
        offset: usize,
        /// Declared name field length.
        length: usize,
    },

    /// The read name is not valid UTF-8.
    #[error("invalid UTF-8 in read name at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the name field.
        offset: usize,
    },

    /// A CIGAR word carries an operation code outside `0..=8`.
    #[error("invalid CIGAR operation code {code} in word {index}")]
    InvalidCigarOp {
        /// The 4-bit operation code found.
        code: u32,
        /// Index of the offending CIGAR word.
        index: usize,
    },

    /// A CIGAR word declares a zero-length operation.
    #[error("zero-length CIGAR operation in word {index}")]
    ZeroLengthCigarOp {
        /// Index of the offending CIGAR word.
        index: usize,
    },

    /// The sequence length field is negative.
    #[error("negative sequence length: {length}")]
    NegativeSequenceLength {
        /// The declared sequence length.
        length: i32,
    },

    /// The cursor did not land exactly on the declared record length.
    #[error("record length mismatch: declared {declared} bytes, consumed {consumed}")]
    LengthMismatch {
        /// The declared record length.
        declared: usize,
        /// Bytes actually consumed by decoding.
        consumed: usize,
    },
}

impl From<RecordDecodeError> for io::Error {
    fn from(e: RecordDecodeError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}
