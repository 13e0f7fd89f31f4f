//! bamstream: streaming decoder for block-compressed binary alignment data
//!
//! # Overview
//!
//! bamstream recovers typed alignment records from a BGZF-wrapped binary
//! stream without ever holding the file in memory. The two layers are
//! independent and compose:
//!
//! - [`bgzf`]: the block-compressed container — header codec, per-block
//!   decompression with CRC verification, a push-based reassembler for
//!   arbitrarily chunked transports, and a pull-based [`std::io::Read`]
//!   adapter with batched parallel decompression.
//! - [`bam`]: the record format — stream header, length-prefixed records
//!   with CIGAR/sequence/quality/tag sub-decoders, and an advisory
//!   validator.
//!
//! Malformed input is rejected deterministically with typed errors that
//! distinguish "these bytes are wrong" from "not enough bytes yet"; see
//! [`bgzf::BlockError`].
//!
//! # Quick Start
//!
//! ```no_run
//! use bamstream::bam::RecordReader;
//! use bamstream::bgzf::BgzfReader;
//! use std::io::BufReader;
//!
//! # fn main() -> std::io::Result<()> {
//! # let compressed: &[u8] = &[];
//! // Stream records with constant memory.
//! let mut reader = RecordReader::new(BgzfReader::new(BufReader::new(compressed)))?;
//!
//! for record in reader.records() {
//!     let record = record?;
//!     println!("{}\t{}\t{}", record.name, record.position, record.cigar_string());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Feeding chunks instead of pulling
//!
//! Transports that push bytes (sockets, async pipelines) drive a
//! [`bgzf::BlockAssembler`] and receive decompressed payloads as blocks
//! complete; see its docs for the end-of-stream accounting.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bam;
pub mod bgzf;
pub mod error;

// Re-export commonly used types
pub use bam::{Record, RecordReader};
pub use bgzf::{BgzfReader, BlockAssembler, StreamEnd};
pub use error::{BamStreamError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
