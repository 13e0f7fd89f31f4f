//! Binary alignment record decoding.
//!
//! Takes decompressed payload bytes (see [`crate::bgzf`]) and turns them
//! into typed [`Record`]s: the stream header first, then length-prefixed
//! records, each combining a 32-byte fixed section with variable-length
//! name, CIGAR, packed sequence, quality, and typed tag fields.
//!
//! Decoding is strict about structure — a record is produced whole, with
//! its declared length exactly consumed, or not at all — with one
//! deliberate exception: malformed trailing tags degrade to a partial
//! tag list instead of failing the record. Semantic plausibility is a
//! separate, advisory concern handled by [`validate`].
//!
//! # Example
//!
//! ```no_run
//! use bamstream::bam::{validate, RecordReader};
//! use bamstream::bgzf::BgzfReader;
//! use std::io::BufReader;
//!
//! # fn main() -> std::io::Result<()> {
//! # let compressed: &[u8] = &[];
//! let mut reader = RecordReader::new(BgzfReader::new(BufReader::new(compressed)))?;
//! let reference_count = reader.header().reference_count();
//!
//! for record in reader.records() {
//!     let record = record?;
//!     for warning in validate(&record, reference_count) {
//!         eprintln!("{}: {warning}", record.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cigar;
pub mod error;
pub mod header;
pub mod quality;
pub mod record;
pub mod sequence;
pub mod tags;
pub mod validator;

pub use cigar::{cigar_text, parse_cigar, CigarOp};
pub use error::RecordDecodeError;
pub use header::{read_header, Header, Reference};
pub use quality::decode_quality;
pub use record::{parse_record, read_record, Record, RecordReader, Records};
pub use sequence::decode_sequence;
pub use tags::{parse_tags, ArrayValue, Tag, TagType, TagValue, Tags};
pub use validator::validate;
