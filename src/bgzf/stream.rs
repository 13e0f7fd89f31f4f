//! Push-based block stream reassembly.
//!
//! Transports hand over bytes in whatever chunk sizes they like; block
//! boundaries almost never line up with chunk boundaries. The assembler
//! buffers incoming bytes, drains every complete block as soon as it is
//! available, and keeps the unconsumed tail for the next chunk.
//!
//! Each instance owns its buffer outright, so independent streams get
//! independent assemblers. The assembler is not thread-safe and is meant
//! to be driven by a single logical caller; callers that want parallelism
//! shard by block boundary with [`super::decompress_parallel`] instead of
//! sharing one assembler.
//!
//! # Leniency policy
//!
//! A structurally invalid header (or a block that fails decompression)
//! stops draining without raising an error from [`BlockAssembler::push`]:
//! trailing garbage after the last block is commonplace and must not
//! poison an otherwise good stream. The failure is not lost, though — it
//! is latched with its stream offset and reported by
//! [`BlockAssembler::finish`], so callers that need strict validation can
//! still tell a clean end from a corrupt one.

use log::{debug, warn};

use super::block::{read_block_header, BlockError};
use super::decompress::decompress_block;

/// How the byte stream ended, reported by [`BlockAssembler::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Every byte was consumed as part of a complete block.
    Clean,
    /// The stream stopped inside a block; `leftover` buffered bytes were
    /// discarded.
    Truncated {
        /// Number of unconsumed bytes at end of input.
        leftover: usize,
    },
    /// A structural failure was hit at `offset` and draining stopped
    /// there; everything after it was ignored.
    Corrupt {
        /// Byte position in the compressed stream where draining stopped.
        offset: u64,
        /// The structural error that stopped the drain.
        error: BlockError,
    },
}

impl StreamEnd {
    /// Whether the stream ended without truncation or corruption.
    pub fn is_clean(&self) -> bool {
        matches!(self, StreamEnd::Clean)
    }
}

/// Stateful reassembler turning arbitrary byte chunks into decompressed
/// block payloads.
///
/// # Example
///
/// ```
/// use bamstream::bgzf::{BlockAssembler, EOF_BLOCK};
///
/// let mut assembler = BlockAssembler::new();
/// // Feed the stream one byte at a time; payloads appear as blocks close.
/// let mut payloads = Vec::new();
/// for byte in EOF_BLOCK {
///     payloads.extend(assembler.push(&[byte]));
/// }
/// assert_eq!(payloads, vec![Vec::new()]);
/// assert!(assembler.finish().is_clean());
/// ```
#[derive(Debug, Default)]
pub struct BlockAssembler {
    buf: Vec<u8>,
    /// Bytes consumed from the front of the stream so far, for offsets in
    /// diagnostics.
    consumed: u64,
    halted: Option<(u64, BlockError)>,
}

impl BlockAssembler {
    /// Create an assembler with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes currently buffered and not yet part of an emitted
    /// block.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Feed one chunk and drain every block that is now complete.
    ///
    /// Returns the decompressed payloads of all blocks completed by this
    /// chunk, in stream order — possibly none (the chunk ended inside a
    /// block), possibly several (the chunk closed more than one block).
    /// Never fails: structural problems halt draining per the module's
    /// leniency policy and are reported by [`finish`](Self::finish).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        if self.halted.is_some() {
            // Past the halt point nothing will be drained again; keeping
            // the bytes would only grow the buffer without bound.
            debug!("assembler halted, dropping {} bytes", chunk.len());
            return Vec::new();
        }

        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut front = 0usize;

        loop {
            let block = match read_block_header(&self.buf, front) {
                Ok(block) => block,
                Err(e) if e.is_incomplete() => break,
                Err(e) => {
                    warn!(
                        "structural header error at stream offset {}, stopping drain: {e}",
                        self.consumed + front as u64
                    );
                    self.halted = Some((self.consumed + front as u64, e));
                    break;
                }
            };

            let end = front + block.compressed_size;
            match decompress_block(&self.buf[front..end]) {
                Ok(payload) => {
                    debug!(
                        "block at offset {}: {} -> {} bytes",
                        self.consumed + front as u64,
                        block.compressed_size,
                        payload.len()
                    );
                    payloads.push(payload);
                    front = end;
                }
                Err(e) => {
                    warn!(
                        "block at stream offset {} failed to decompress, stopping drain: {e}",
                        self.consumed + front as u64
                    );
                    self.halted = Some((self.consumed + front as u64, e));
                    break;
                }
            }
        }

        self.buf.drain(..front);
        self.consumed += front as u64;
        payloads
    }

    /// Signal end of input and report how the stream ended.
    ///
    /// Draining happens eagerly on every push, so by now the buffer can
    /// only hold an incomplete tail. A non-empty tail is reported as
    /// [`StreamEnd::Truncated`] and discarded; a latched structural
    /// failure is reported as [`StreamEnd::Corrupt`]. Neither is a hard
    /// error — callers decide how strict to be.
    pub fn finish(self) -> StreamEnd {
        if let Some((offset, error)) = self.halted {
            return StreamEnd::Corrupt { offset, error };
        }

        if !self.buf.is_empty() {
            debug!(
                "discarding {} trailing bytes of incomplete block",
                self.buf.len()
            );
            return StreamEnd::Truncated {
                leftover: self.buf.len(),
            };
        }

        StreamEnd::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgzf::block::EOF_BLOCK;
    use crate::bgzf::testutil::compress_block;

    fn three_block_stream() -> (Vec<u8>, Vec<Vec<u8>>) {
        let payloads = vec![
            b"first payload".to_vec(),
            b"the second payload is a little longer".to_vec(),
            Vec::new(),
        ];
        let mut stream = Vec::new();
        stream.extend_from_slice(&compress_block(&payloads[0]));
        stream.extend_from_slice(&compress_block(&payloads[1]));
        stream.extend_from_slice(&EOF_BLOCK);
        (stream, payloads)
    }

    #[test]
    fn whole_stream_in_one_push() {
        let (stream, expected) = three_block_stream();
        let mut assembler = BlockAssembler::new();
        assert_eq!(assembler.push(&stream), expected);
        assert_eq!(assembler.buffered(), 0);
        assert_eq!(assembler.finish(), StreamEnd::Clean);
    }

    #[test]
    fn one_byte_at_a_time_matches_one_push() {
        let (stream, expected) = three_block_stream();
        let mut assembler = BlockAssembler::new();
        let mut payloads = Vec::new();
        for byte in &stream {
            payloads.extend(assembler.push(std::slice::from_ref(byte)));
        }
        assert_eq!(payloads, expected);
        assert!(assembler.finish().is_clean());
    }

    #[test]
    fn chunk_spanning_block_boundary() {
        let (stream, expected) = three_block_stream();
        // Split in the middle of the second block.
        let cut = compress_block(b"first payload").len() + 10;
        let mut assembler = BlockAssembler::new();
        let mut payloads = assembler.push(&stream[..cut]);
        assert_eq!(payloads.len(), 1);
        payloads.extend(assembler.push(&stream[cut..]));
        assert_eq!(payloads, expected);
    }

    #[test]
    fn incomplete_tail_is_truncated_not_error() {
        let (stream, _) = three_block_stream();
        let mut assembler = BlockAssembler::new();
        let cut = stream.len() - 9;
        assert_eq!(assembler.push(&stream[..cut]).len(), 2);
        assert_eq!(assembler.buffered(), EOF_BLOCK.len() - 9);
        assert_eq!(
            assembler.finish(),
            StreamEnd::Truncated {
                leftover: EOF_BLOCK.len() - 9
            }
        );
    }

    #[test]
    fn trailing_garbage_stops_drain_quietly() {
        let mut stream = compress_block(b"good block");
        let good_len = stream.len() as u64;
        stream.extend_from_slice(b"this is not a block header at all");

        let mut assembler = BlockAssembler::new();
        let payloads = assembler.push(&stream);
        assert_eq!(payloads, vec![b"good block".to_vec()]);

        match assembler.finish() {
            StreamEnd::Corrupt { offset, error } => {
                assert_eq!(offset, good_len);
                assert!(!error.is_incomplete());
            }
            other => panic!("expected corrupt end, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_checksum_latches_and_halts() {
        let mut stream = compress_block(b"block one");
        let bad_offset = stream.len() as u64;
        let mut bad = compress_block(b"block two");
        let len = bad.len();
        bad[len - 8] ^= 0xff;
        stream.extend_from_slice(&bad);
        stream.extend_from_slice(&compress_block(b"block three"));

        let mut assembler = BlockAssembler::new();
        let payloads = assembler.push(&stream);
        // Draining stops at the bad block; the valid block after it is
        // not reached.
        assert_eq!(payloads, vec![b"block one".to_vec()]);

        // Later pushes are ignored once halted.
        assert!(assembler.push(&compress_block(b"more")).is_empty());

        match assembler.finish() {
            StreamEnd::Corrupt { offset, error } => {
                assert_eq!(offset, bad_offset);
                assert!(matches!(error, BlockError::ChecksumMismatch { .. }));
            }
            other => panic!("expected corrupt end, got {other:?}"),
        }
    }

    #[test]
    fn independent_instances_do_not_share_state() {
        let block = compress_block(b"payload");
        let mut a = BlockAssembler::new();
        let mut b = BlockAssembler::new();
        a.push(&block[..10]);
        assert_eq!(b.push(&block), vec![b"payload".to_vec()]);
        assert_eq!(a.buffered(), 10);
    }

    #[test]
    fn empty_push_is_harmless() {
        let mut assembler = BlockAssembler::new();
        assert!(assembler.push(&[]).is_empty());
        assert!(assembler.finish().is_clean());
    }
}
