//! Block decompression and integrity checking.
//!
//! A block handed to [`decompress_block`] is never trusted: the header is
//! re-validated, the payload is inflated, and both the declared
//! uncompressed size and the declared CRC32 are verified against what
//! decompression actually produced. Any mismatch is a hard failure for
//! that block, carrying the declared and actual values.
//!
//! For in-memory buffers the block boundaries are self-describing, so a
//! whole buffer can be split into blocks up front ([`scan_blocks`]) and
//! decompressed in parallel ([`decompress_parallel`]) without any shared
//! state between blocks.

use flate2::read::DeflateDecoder;
use flate2::Crc;
use rayon::prelude::*;
use std::io::Read;

use super::block::{read_block_header, Block, BlockError, FOOTER_SIZE, HEADER_SIZE};

/// Decompress one complete block and verify its integrity.
///
/// `block_bytes` must start at the block header; the block's declared
/// size selects how much of the slice is used. The smallest legal input
/// is 26 bytes (an empty payload).
///
/// # Errors
///
/// Structural [`BlockError`] variants for a malformed header, a broken
/// deflate stream, or a size/checksum mismatch between the footer and the
/// decompressed payload. [`BlockError::Incomplete`] if the slice is
/// shorter than the declared block.
pub fn decompress_block(block_bytes: &[u8]) -> Result<Vec<u8>, BlockError> {
    let block = read_block_header(block_bytes, 0)?;

    let compressed = &block_bytes[HEADER_SIZE..block.compressed_size - FOOTER_SIZE];

    let mut payload = Vec::with_capacity(block.uncompressed_size);
    let mut decoder = DeflateDecoder::new(compressed);
    decoder
        .read_to_end(&mut payload)
        .map_err(|e| BlockError::Inflate(e.to_string()))?;

    if payload.len() != block.uncompressed_size {
        return Err(BlockError::SizeMismatch {
            declared: block.uncompressed_size,
            actual: payload.len(),
        });
    }

    let mut crc = Crc::new();
    crc.update(&payload);
    if crc.sum() != block.checksum {
        return Err(BlockError::ChecksumMismatch {
            declared: block.checksum,
            actual: crc.sum(),
        });
    }

    Ok(payload)
}

/// Split a complete in-memory buffer into its block descriptors.
///
/// Walks the buffer using only header self-description; nothing is
/// decompressed. The buffer must contain whole blocks back to back: a
/// partial trailing block or any malformed header is an error (use
/// [`super::BlockAssembler`] for streams that may end mid-block).
pub fn scan_blocks(buf: &[u8]) -> Result<Vec<Block>, BlockError> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while pos < buf.len() {
        let block = read_block_header(buf, pos)?;
        pos += block.compressed_size;
        blocks.push(block);
    }

    Ok(blocks)
}

/// Decompress a complete in-memory buffer of blocks in parallel.
///
/// Blocks are located with [`scan_blocks`], decompressed independently
/// across the rayon thread pool, and concatenated in stream order. This
/// is the offset-sharded counterpart of the streaming assembler: each
/// block range is its own unit of work and no state is shared.
///
/// # Example
///
/// ```
/// use bamstream::bgzf::{decompress_parallel, EOF_BLOCK};
///
/// let payload = decompress_parallel(&EOF_BLOCK).unwrap();
/// assert!(payload.is_empty());
/// ```
pub fn decompress_parallel(buf: &[u8]) -> Result<Vec<u8>, BlockError> {
    let blocks = scan_blocks(buf)?;

    let payloads = blocks
        .par_iter()
        .map(|block| {
            let start = block.offset as usize;
            decompress_block(&buf[start..start + block.compressed_size])
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(payloads.concat())
}
