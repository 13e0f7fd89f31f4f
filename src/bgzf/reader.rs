//! Pull-based decompressing reader.
//!
//! [`BgzfReader`] adapts a buffered byte source into a [`Read`] over the
//! decompressed payload stream. Blocks are pulled in batches of
//! [`PARALLEL_BLOCK_COUNT`] and decompressed together on the rayon pool,
//! which keeps memory bounded (a handful of 64 KB blocks in flight)
//! while still using every core.
//!
//! Unlike the push assembler, this layer is strict: a malformed or
//! corrupt block surfaces as an [`io::Error`] instead of silently ending
//! the stream. The end-of-stream marker block and transport EOF both end
//! the stream cleanly.

use rayon::prelude::*;
use std::io::{self, BufRead, Read};

use super::block::{declared_block_size, is_eof_block, HEADER_SIZE};
use super::decompress::decompress_block;

/// Number of raw blocks decompressed per batch.
///
/// Bounds the in-flight memory to roughly `2 * PARALLEL_BLOCK_COUNT *
/// 64 KB` (compressed plus decompressed) regardless of stream size.
pub const PARALLEL_BLOCK_COUNT: usize = 8;

/// Streaming decompressor implementing [`Read`] over block payloads.
///
/// # Example
///
/// ```
/// use bamstream::bgzf::{BgzfReader, EOF_BLOCK};
/// use std::io::Read;
///
/// let mut reader = BgzfReader::new(&EOF_BLOCK[..]);
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).unwrap();
/// assert!(out.is_empty());
/// ```
pub struct BgzfReader<R> {
    inner: R,
    /// Decompressed bytes ready to serve.
    output: Vec<u8>,
    /// Read position within `output`.
    pos: usize,
    eof: bool,
}

impl<R: BufRead> BgzfReader<R> {
    /// Wrap a buffered byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            output: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Read one complete raw block, or `None` at transport EOF.
    fn read_raw_block(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut header = [0u8; HEADER_SIZE];
        match self.inner.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let size = declared_block_size(&header)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut data = vec![0u8; size];
        data[..HEADER_SIZE].copy_from_slice(&header);
        self.inner.read_exact(&mut data[HEADER_SIZE..])?;

        Ok(Some(data))
    }

    /// Pull the next batch of blocks and decompress them in parallel.
    fn refill(&mut self) -> io::Result<()> {
        let mut blocks = Vec::with_capacity(PARALLEL_BLOCK_COUNT);

        while blocks.len() < PARALLEL_BLOCK_COUNT {
            match self.read_raw_block()? {
                Some(block) => {
                    if is_eof_block(&block) {
                        self.eof = true;
                        break;
                    }
                    blocks.push(block);
                }
                None => {
                    self.eof = true;
                    break;
                }
            }
        }

        let payloads = blocks
            .par_iter()
            .map(|block| decompress_block(block))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.output.clear();
        for payload in payloads {
            self.output.extend_from_slice(&payload);
        }
        self.pos = 0;

        Ok(())
    }
}

impl<R: BufRead> Read for BgzfReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.output.len() {
            if self.eof {
                return Ok(0);
            }
            self.refill()?;
            if self.output.is_empty() && self.eof {
                return Ok(0);
            }
        }

        let available = self.output.len() - self.pos;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.output[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
