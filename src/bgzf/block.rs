//! BGZF block header codec.
//!
//! A BGZF stream is a sequence of independent gzip members, each carrying
//! its own size in a fixed-layout extra field so block boundaries can be
//! computed without decompressing anything.
//!
//! # Block Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                      │
//! │  - ID1=0x1f ID2=0x8b (gzip magic)                      │
//! │  - CM=0x08 (deflate)                                   │
//! │  - FLG=0x04 (FEXTRA set)                               │
//! │  - MTIME(4) XFL(1) OS(1)                               │
//! │  - XLEN=6                                              │
//! │  - subfield: SI1='B' SI2='C' SLEN=2 BSIZE(2)           │
//! │    where BSIZE = total block size - 1                  │
//! ├────────────────────────────────────────────────────────┤
//! │ Compressed payload (raw deflate)                       │
//! ├────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes): CRC32(4) ISIZE(4)                    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte fields are little-endian. The footer is read from fixed
//! offsets relative to the block end, never parsed out of the deflate
//! stream itself.

use thiserror::Error;

/// Size of the fixed BGZF block header.
pub const HEADER_SIZE: usize = 18;

/// Size of the BGZF block footer (CRC32 + ISIZE).
pub const FOOTER_SIZE: usize = 8;

/// Smallest legal block: header + footer around an empty deflate stream.
pub const MIN_BLOCK_SIZE: usize = 26;

/// Largest legal block (BSIZE is a u16, so total size is at most 65536).
pub const MAX_BLOCK_SIZE: usize = 65536;

/// Largest legal uncompressed payload per block.
pub const MAX_PAYLOAD_SIZE: usize = 65536;

/// The 28-byte empty block appended as an end-of-stream marker.
pub const EOF_BLOCK: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Errors from block header reading and block decompression.
///
/// `Incomplete` is the only resource-class variant: it means the buffer
/// simply does not hold enough bytes yet, which a streaming caller treats
/// as "wait for more input". Every other variant is structural — the bytes
/// present are wrong, and no amount of further input fixes them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Not enough bytes in the buffer for the header or the declared block.
    #[error("incomplete block: need {needed} bytes, have {available}")]
    Incomplete {
        /// Bytes required to make progress.
        needed: usize,
        /// Bytes currently available.
        available: usize,
    },

    /// The two gzip magic bytes are wrong.
    #[error("invalid block magic: expected [0x1f, 0x8b], got [{:#04x}, {:#04x}]", found[0], found[1])]
    InvalidMagic {
        /// The two bytes actually found.
        found: [u8; 2],
    },

    /// The compression method is not deflate (0x08).
    #[error("invalid compression method: expected 0x08, got {found:#04x}")]
    InvalidMethod {
        /// The method byte actually found.
        found: u8,
    },

    /// The FEXTRA flag bit is not set, so there is no BSIZE subfield.
    #[error("extra-field flag not set (FLG = {flags:#04x})")]
    MissingExtraField {
        /// The flag byte actually found.
        flags: u8,
    },

    /// The extra-field length is not exactly 6.
    #[error("invalid extra-field length: expected 6, got {found}")]
    InvalidExtraLength {
        /// The XLEN value actually found.
        found: u16,
    },

    /// The extra subfield identifier is not "BC".
    #[error("invalid subfield identifier: expected \"BC\", got [{:#04x}, {:#04x}]", found[0], found[1])]
    InvalidSubfieldId {
        /// The two identifier bytes actually found.
        found: [u8; 2],
    },

    /// The subfield length is not exactly 2.
    #[error("invalid subfield length: expected 2, got {found}")]
    InvalidSubfieldLength {
        /// The SLEN value actually found.
        found: u16,
    },

    /// The declared total block size falls outside `[26, 65536]`.
    #[error("block size {size} outside [{MIN_BLOCK_SIZE}, {MAX_BLOCK_SIZE}]")]
    BlockSizeOutOfRange {
        /// The declared total size.
        size: usize,
    },

    /// The declared uncompressed payload size exceeds 65536.
    #[error("uncompressed size {size} exceeds {MAX_PAYLOAD_SIZE}")]
    PayloadSizeOutOfRange {
        /// The declared uncompressed size.
        size: usize,
    },

    /// The deflate stream inside the block could not be decompressed.
    #[error("deflate failure: {0}")]
    Inflate(String),

    /// The decompressed payload length does not match the declared ISIZE.
    #[error("uncompressed size mismatch: declared {declared}, got {actual}")]
    SizeMismatch {
        /// Size declared in the footer.
        declared: usize,
        /// Size actually produced by decompression.
        actual: usize,
    },

    /// The decompressed payload checksum does not match the declared CRC32.
    #[error("checksum mismatch: declared {declared:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// CRC32 declared in the footer.
        declared: u32,
        /// CRC32 computed over the decompressed payload.
        actual: u32,
    },
}

impl BlockError {
    /// Whether this is the resource-class "wait for more bytes" condition
    /// rather than genuine corruption.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, BlockError::Incomplete { .. })
    }
}

/// Descriptor of one compressed block, read from its header and footer.
///
/// Blocks are transient: created by [`read_block_header`], handed to the
/// decompressor, then discarded. They are not an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Byte position of the block in the compressed stream.
    pub offset: u64,
    /// Total block size in bytes, header and footer included.
    pub compressed_size: usize,
    /// Uncompressed payload size declared in the footer.
    pub uncompressed_size: usize,
    /// CRC32 of the uncompressed payload declared in the footer.
    pub checksum: u32,
}

/// Validate the fixed header fields and return the declared total block
/// size (`BSIZE + 1`).
///
/// Only the 18 header bytes are examined; the caller is responsible for
/// fetching the rest of the block. Returns [`BlockError::Incomplete`] if
/// fewer than 18 bytes are given.
pub fn declared_block_size(header: &[u8]) -> Result<usize, BlockError> {
    if header.len() < HEADER_SIZE {
        return Err(BlockError::Incomplete {
            needed: HEADER_SIZE,
            available: header.len(),
        });
    }

    if header[0] != 0x1f || header[1] != 0x8b {
        return Err(BlockError::InvalidMagic {
            found: [header[0], header[1]],
        });
    }

    if header[2] != 0x08 {
        return Err(BlockError::InvalidMethod { found: header[2] });
    }

    if header[3] & 0x04 == 0 {
        return Err(BlockError::MissingExtraField { flags: header[3] });
    }

    let xlen = u16::from_le_bytes([header[10], header[11]]);
    if xlen != 6 {
        return Err(BlockError::InvalidExtraLength { found: xlen });
    }

    if header[12] != b'B' || header[13] != b'C' {
        return Err(BlockError::InvalidSubfieldId {
            found: [header[12], header[13]],
        });
    }

    let slen = u16::from_le_bytes([header[14], header[15]]);
    if slen != 2 {
        return Err(BlockError::InvalidSubfieldLength { found: slen });
    }

    let size = u16::from_le_bytes([header[16], header[17]]) as usize + 1;
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&size) {
        return Err(BlockError::BlockSizeOutOfRange { size });
    }

    Ok(size)
}

/// Read and validate one block header at `offset`, returning the block
/// descriptor.
///
/// The buffer must contain the complete block: the footer fields (CRC32
/// and ISIZE) are read from the last 8 bytes of the declared range. A
/// buffer holding a valid header but not the whole block yields
/// [`BlockError::Incomplete`], which streaming callers must treat as
/// "wait", not as corruption.
///
/// # Example
///
/// ```
/// use bamstream::bgzf::{read_block_header, EOF_BLOCK};
///
/// let block = read_block_header(&EOF_BLOCK, 0).unwrap();
/// assert_eq!(block.compressed_size, 28);
/// assert_eq!(block.uncompressed_size, 0);
/// ```
pub fn read_block_header(buf: &[u8], offset: usize) -> Result<Block, BlockError> {
    let available = buf.len().saturating_sub(offset);
    if available < HEADER_SIZE {
        return Err(BlockError::Incomplete {
            needed: HEADER_SIZE,
            available,
        });
    }

    let compressed_size = declared_block_size(&buf[offset..])?;
    if available < compressed_size {
        return Err(BlockError::Incomplete {
            needed: compressed_size,
            available,
        });
    }

    let end = offset + compressed_size;
    let checksum = u32::from_le_bytes([buf[end - 8], buf[end - 7], buf[end - 6], buf[end - 5]]);
    let uncompressed_size =
        u32::from_le_bytes([buf[end - 4], buf[end - 3], buf[end - 2], buf[end - 1]]) as usize;

    if uncompressed_size > MAX_PAYLOAD_SIZE {
        return Err(BlockError::PayloadSizeOutOfRange {
            size: uncompressed_size,
        });
    }

    Ok(Block {
        offset: offset as u64,
        compressed_size,
        uncompressed_size,
        checksum,
    })
}

/// Check whether `bytes` start with the BGZF end-of-stream marker block.
pub fn is_eof_block(bytes: &[u8]) -> bool {
    bytes.len() >= EOF_BLOCK.len() && bytes[..EOF_BLOCK.len()] == EOF_BLOCK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_block_header() {
        let block = read_block_header(&EOF_BLOCK, 0).unwrap();
        assert_eq!(block.offset, 0);
        assert_eq!(block.compressed_size, 28);
        assert_eq!(block.uncompressed_size, 0);
        assert_eq!(block.checksum, 0);
        assert!(is_eof_block(&EOF_BLOCK));
    }

    #[test]
    fn header_at_offset() {
        let mut buf = vec![0xAA; 5];
        buf.extend_from_slice(&EOF_BLOCK);
        let block = read_block_header(&buf, 5).unwrap();
        assert_eq!(block.offset, 5);
        assert_eq!(block.compressed_size, 28);
    }

    #[test]
    fn short_buffer_is_incomplete() {
        let err = read_block_header(&EOF_BLOCK[..10], 0).unwrap_err();
        assert_eq!(
            err,
            BlockError::Incomplete {
                needed: HEADER_SIZE,
                available: 10
            }
        );
        assert!(err.is_incomplete());
    }

    #[test]
    fn truncated_block_is_incomplete() {
        // Header is intact but the declared 28 bytes are not all there.
        let err = read_block_header(&EOF_BLOCK[..20], 0).unwrap_err();
        assert_eq!(
            err,
            BlockError::Incomplete {
                needed: 28,
                available: 20
            }
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = EOF_BLOCK;
        buf[0] = 0x00;
        let err = read_block_header(&buf, 0).unwrap_err();
        assert_eq!(
            err,
            BlockError::InvalidMagic {
                found: [0x00, 0x8b]
            }
        );
        assert!(!err.is_incomplete());
    }

    #[test]
    fn rejects_bad_method() {
        let mut buf = EOF_BLOCK;
        buf[2] = 0x07;
        assert_eq!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::InvalidMethod { found: 0x07 }
        );
    }

    #[test]
    fn rejects_missing_extra_flag() {
        let mut buf = EOF_BLOCK;
        buf[3] = 0x00;
        assert_eq!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::MissingExtraField { flags: 0x00 }
        );
    }

    #[test]
    fn rejects_wrong_extra_length() {
        let mut buf = EOF_BLOCK;
        buf[10] = 8;
        assert_eq!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::InvalidExtraLength { found: 8 }
        );
    }

    #[test]
    fn rejects_wrong_subfield_id() {
        let mut buf = EOF_BLOCK;
        buf[12] = b'X';
        assert!(matches!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::InvalidSubfieldId { .. }
        ));
    }

    #[test]
    fn rejects_wrong_subfield_length() {
        let mut buf = EOF_BLOCK;
        buf[14] = 4;
        assert_eq!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::InvalidSubfieldLength { found: 4 }
        );
    }

    #[test]
    fn rejects_undersized_block() {
        let mut buf = EOF_BLOCK;
        // BSIZE = 24 declares a 25-byte block, below the 26-byte minimum.
        buf[16] = 24;
        buf[17] = 0;
        assert_eq!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::BlockSizeOutOfRange { size: 25 }
        );
    }

    #[test]
    fn rejects_oversized_payload() {
        let mut buf = EOF_BLOCK.to_vec();
        let len = buf.len();
        // ISIZE = 65537, one past the allowed maximum.
        buf[len - 4..].copy_from_slice(&65537u32.to_le_bytes());
        assert_eq!(
            read_block_header(&buf, 0).unwrap_err(),
            BlockError::PayloadSizeOutOfRange { size: 65537 }
        );
    }

    #[test]
    fn max_block_size_is_accepted() {
        // BSIZE = 0xffff declares the maximum 65536-byte block.
        let mut buf = vec![0u8; MAX_BLOCK_SIZE];
        buf[..HEADER_SIZE].copy_from_slice(&EOF_BLOCK[..HEADER_SIZE]);
        buf[16] = 0xff;
        buf[17] = 0xff;
        let block = read_block_header(&buf, 0).unwrap();
        assert_eq!(block.compressed_size, MAX_BLOCK_SIZE);
    }
}
