//! BGZF block-compressed container decoding.
//!
//! The container wraps its payload in independently decompressible
//! blocks, each at most 64 KB uncompressed and self-describing its own
//! compressed size. This module provides the three ways of consuming
//! such a stream:
//!
//! - [`read_block_header`] / [`decompress_block`]: one block at a time,
//!   for callers that manage their own buffers.
//! - [`BlockAssembler`]: push-based reassembly of arbitrarily chunked
//!   input, lenient about trailing garbage (see its module docs).
//! - [`BgzfReader`]: a pull-based [`std::io::Read`] adapter with batched
//!   parallel decompression, plus [`decompress_parallel`] for whole
//!   in-memory buffers.
//!
//! Writing/encoding blocks is out of scope; the decoder treats raw
//! DEFLATE as an external primitive (`flate2`).

mod block;
mod decompress;
mod reader;
mod stream;

pub use block::{
    declared_block_size, is_eof_block, read_block_header, Block, BlockError, EOF_BLOCK,
    FOOTER_SIZE, HEADER_SIZE, MAX_BLOCK_SIZE, MAX_PAYLOAD_SIZE, MIN_BLOCK_SIZE,
};
pub use decompress::{decompress_block, decompress_parallel, scan_blocks};
pub use reader::{BgzfReader, PARALLEL_BLOCK_COUNT};
pub use stream::{BlockAssembler, StreamEnd};

#[cfg(test)]
pub(crate) mod testutil {
    use flate2::write::DeflateEncoder;
    use flate2::{Compression, Crc};
    use std::io::Write;

    use super::block::{FOOTER_SIZE, HEADER_SIZE, MAX_BLOCK_SIZE};

    /// Build one well-formed block around `payload`.
    pub fn compress_block(payload: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        let cdata = encoder.finish().unwrap();

        let total = HEADER_SIZE + cdata.len() + FOOTER_SIZE;
        assert!(total <= MAX_BLOCK_SIZE);

        let mut crc = Crc::new();
        crc.update(payload);

        let mut block = Vec::with_capacity(total);
        block.extend_from_slice(&[0x1f, 0x8b, 0x08, 0x04]);
        block.extend_from_slice(&[0, 0, 0, 0]); // MTIME
        block.push(0); // XFL
        block.push(0xff); // OS
        block.extend_from_slice(&6u16.to_le_bytes()); // XLEN
        block.extend_from_slice(b"BC");
        block.extend_from_slice(&2u16.to_le_bytes());
        block.extend_from_slice(&((total - 1) as u16).to_le_bytes());
        block.extend_from_slice(&cdata);
        block.extend_from_slice(&crc.sum().to_le_bytes());
        block.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        block
    }
}
