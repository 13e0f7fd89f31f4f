//! Alignment record decoding.
//!
//! A record occupies a declared number of bytes of the decompressed
//! stream: a 32-byte fixed section followed by the read name, CIGAR
//! words, packed sequence, quality bytes, and whatever remains as the
//! tag region.
//!
//! # Binary Layout
//!
//! ```text
//! Record (little-endian):
//! - ref_id (int32)          reference sequence id, -1 = unmapped
//! - pos (int32)             0-based position, -1 = unmapped
//! - l_read_name (uint8)     name length including NUL, in [1, 255]
//! - mapq (uint8)            mapping quality
//! - bin (uint16)            spatial index bin, carried through
//! - n_cigar_op (uint16)     number of CIGAR words
//! - flag (uint16)           bitwise flags
//! - l_seq (int32)           sequence length, >= 0
//! - next_ref_id (int32)     mate reference id
//! - next_pos (int32)        mate position
//! - tlen (int32)            template length
//! - read_name (l_read_name bytes, NUL-terminated)
//! - cigar (n_cigar_op x 4 bytes)
//! - seq (ceil(l_seq / 2) bytes, 4-bit packed)
//! - qual (l_seq bytes)
//! - tags (rest of the declared length)
//! ```
//!
//! Every variable-length field is bounds-checked against the declared
//! length before it is read, and the cursor must land exactly on the
//! declared length — a record is decoded whole or not at all. The one
//! exception is the tag region, which soft-fails per its own rules.

use log::debug;
use std::io::{self, Read};

use super::cigar::{cigar_text, parse_cigar, CigarOp};
use super::error::RecordDecodeError;
use super::header::{read_header, Header};
use super::quality::decode_quality;
use super::sequence::decode_sequence;
use super::tags::{parse_tags, Tags};

/// Size of the fixed field section.
const FIXED_SECTION: usize = 32;

/// One decoded alignment record.
///
/// All fields are carried through as stored — reference ids and
/// positions are not range-checked here (that is the validator's job),
/// and `bin` is passed along unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Read name, NUL terminator stripped.
    pub name: String,
    /// Reference sequence id (-1 = unmapped).
    pub reference_id: i32,
    /// 0-based leftmost position (-1 = unmapped).
    pub position: i32,
    /// Declared read-name field length, terminator included.
    pub read_name_len: u8,
    /// Mapping quality.
    pub mapq: u8,
    /// Spatial index bin, carried through unmodified.
    pub bin: u16,
    /// Number of CIGAR operations.
    pub cigar_op_count: u16,
    /// Bitwise flags.
    pub flags: u16,
    /// Sequence length in bases.
    pub sequence_length: usize,
    /// Mate reference id.
    pub mate_reference_id: i32,
    /// Mate position.
    pub mate_position: i32,
    /// Template length.
    pub template_length: i32,
    /// CIGAR operations; empty renders as `"*"`.
    pub cigar: Vec<CigarOp>,
    /// Nucleotide text over `=ACMGRSVTWYHKDBN`, or `"*"` when absent.
    pub sequence: String,
    /// Phred+33 quality text, or `"*"` when absent.
    pub quality: String,
    /// Decoded tag list with its soft-failure outcome.
    pub tags: Tags,
    /// Bytes of the record slice consumed; always the declared length.
    pub bytes_consumed: usize,
}

impl Record {
    /// Whether the paired flag (0x1) is set.
    pub fn is_paired(&self) -> bool {
        self.flags & 0x1 != 0
    }

    /// Whether the unmapped flag (0x4) is set.
    pub fn is_unmapped(&self) -> bool {
        self.flags & 0x4 != 0
    }

    /// Whether the reverse-complement flag (0x10) is set.
    pub fn is_reverse_complement(&self) -> bool {
        self.flags & 0x10 != 0
    }

    /// The CIGAR as text (`"10M5I3D"`), or `"*"` for no operations.
    pub fn cigar_string(&self) -> String {
        cigar_text(&self.cigar)
    }
}

fn read_i32_le(data: &[u8], cursor: &mut usize, field: &'static str) -> io::Result<i32> {
    let bytes = data
        .get(*cursor..*cursor + 4)
        .ok_or(RecordDecodeError::Truncated {
            field,
            offset: *cursor,
            needed: 4,
            available: data.len().saturating_sub(*cursor),
        })?;
    let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    *cursor += 4;
    Ok(value)
}

fn read_u16_le(data: &[u8], cursor: &mut usize, field: &'static str) -> io::Result<u16> {
    let bytes = data
        .get(*cursor..*cursor + 2)
        .ok_or(RecordDecodeError::Truncated {
            field,
            offset: *cursor,
            needed: 2,
            available: data.len().saturating_sub(*cursor),
        })?;
    let value = u16::from_le_bytes([bytes[0], bytes[1]]);
    *cursor += 2;
    Ok(value)
}

fn read_u8(data: &[u8], cursor: &mut usize, field: &'static str) -> io::Result<u8> {
    let value = *data.get(*cursor).ok_or(RecordDecodeError::Truncated {
        field,
        offset: *cursor,
        needed: 1,
        available: 0,
    })?;
    *cursor += 1;
    Ok(value)
}

/// Decode one record from exactly its declared byte range.
///
/// `data` must be the declared record slice — callers that frame records
/// with a length prefix slice that many bytes and pass them here (see
/// [`read_record`]).
///
/// # Errors
///
/// Structural [`RecordDecodeError`]s (as `io::Error`) when the declared
/// length is under 32 bytes, a field overruns the declared length, the
/// read name has no terminator, a CIGAR word is invalid, or the sequence
/// length is negative. Malformed trailing tags are not an error; they
/// set [`Tags::truncated`] on the result.
pub fn parse_record(data: &[u8]) -> io::Result<Record> {
    if data.len() < FIXED_SECTION {
        return Err(RecordDecodeError::TooShort { length: data.len() }.into());
    }

    let mut cursor = 0;

    let reference_id = read_i32_le(data, &mut cursor, "ref_id")?;
    let position = read_i32_le(data, &mut cursor, "pos")?;

    // One packed 32-bit word: bin[16..32] | mapq[8..16] | l_read_name[0..8].
    let read_name_len = read_u8(data, &mut cursor, "l_read_name")?;
    let mapq = read_u8(data, &mut cursor, "mapq")?;
    let bin = read_u16_le(data, &mut cursor, "bin")?;

    // One packed 32-bit word: flag[16..32] | n_cigar_op[0..16].
    let cigar_op_count = read_u16_le(data, &mut cursor, "n_cigar_op")?;
    let flags = read_u16_le(data, &mut cursor, "flag")?;

    let l_seq = read_i32_le(data, &mut cursor, "l_seq")?;
    if l_seq < 0 {
        return Err(RecordDecodeError::NegativeSequenceLength { length: l_seq }.into());
    }
    let sequence_length = l_seq as usize;

    let mate_reference_id = read_i32_le(data, &mut cursor, "next_ref_id")?;
    let mate_position = read_i32_le(data, &mut cursor, "next_pos")?;
    let template_length = read_i32_le(data, &mut cursor, "tlen")?;

    if read_name_len == 0 {
        return Err(RecordDecodeError::ZeroReadNameLength { offset: 8 }.into());
    }

    // Read name: exactly read_name_len bytes, NUL required within them.
    let name_len = read_name_len as usize;
    if cursor + name_len > data.len() {
        return Err(RecordDecodeError::Truncated {
            field: "read_name",
            offset: cursor,
            needed: name_len,
            available: data.len() - cursor,
        }
        .into());
    }
    let name_bytes = &data[cursor..cursor + name_len];
    let nul = name_bytes.iter().position(|&b| b == 0).ok_or(
        RecordDecodeError::MissingNulTerminator {
            offset: cursor,
            length: name_len,
        },
    )?;
    let name = std::str::from_utf8(&name_bytes[..nul])
        .map_err(|_| RecordDecodeError::InvalidUtf8 { offset: cursor })?
        .to_string();
    cursor += name_len;

    // CIGAR words.
    let cigar_bytes = cigar_op_count as usize * 4;
    if cursor + cigar_bytes > data.len() {
        return Err(RecordDecodeError::Truncated {
            field: "cigar",
            offset: cursor,
            needed: cigar_bytes,
            available: data.len() - cursor,
        }
        .into());
    }
    let cigar = parse_cigar(&data[cursor..cursor + cigar_bytes], cigar_op_count as usize)?;
    cursor += cigar_bytes;

    // Packed sequence, then quality; both use the "*" sentinel when the
    // sequence length is zero.
    let packed_len = sequence_length.div_ceil(2);
    if cursor + packed_len > data.len() {
        return Err(RecordDecodeError::Truncated {
            field: "sequence",
            offset: cursor,
            needed: packed_len,
            available: data.len() - cursor,
        }
        .into());
    }
    let sequence = if sequence_length == 0 {
        String::from("*")
    } else {
        decode_sequence(&data[cursor..cursor + packed_len], sequence_length)?
    };
    cursor += packed_len;

    if cursor + sequence_length > data.len() {
        return Err(RecordDecodeError::Truncated {
            field: "quality",
            offset: cursor,
            needed: sequence_length,
            available: data.len() - cursor,
        }
        .into());
    }
    let quality = if sequence_length == 0 {
        String::from("*")
    } else {
        decode_quality(&data[cursor..cursor + sequence_length], sequence_length)?
    };
    cursor += sequence_length;

    // Everything up to the declared length is the tag region.
    let tag_region = &data[cursor..];
    let tags = parse_tags(tag_region);
    if tags.truncated {
        debug!(
            "record {name}: tag region not cleanly consumed ({} tags kept)",
            tags.len()
        );
    }
    cursor += tag_region.len();

    if cursor != data.len() {
        return Err(RecordDecodeError::LengthMismatch {
            declared: data.len(),
            consumed: cursor,
        }
        .into());
    }

    Ok(Record {
        name,
        reference_id,
        position,
        read_name_len,
        mapq,
        bin,
        cigar_op_count,
        flags,
        sequence_length,
        mate_reference_id,
        mate_position,
        template_length,
        cigar,
        sequence,
        quality,
        tags,
        bytes_consumed: cursor,
    })
}

/// Read one length-prefixed record from a byte stream.
///
/// The record is framed by a little-endian i32 length; exactly that many
/// bytes are then decoded with [`parse_record`]. Returns `Ok(None)` at a
/// clean EOF (no length prefix at all).
pub fn read_record<R: Read>(reader: &mut R) -> io::Result<Option<Record>> {
    let mut size_buf = [0u8; 4];
    match reader.read_exact(&mut size_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let declared = i32::from_le_bytes(size_buf);
    if declared < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid record length: {declared}"),
        ));
    }

    let mut data = vec![0u8; declared as usize];
    reader.read_exact(&mut data)?;

    parse_record(&data).map(Some)
}

/// Streaming record reader over any decompressed byte source.
///
/// Reads the stream header during construction, then yields records one
/// at a time, reusing one internal buffer across reads. Compose with
/// [`crate::bgzf::BgzfReader`] to decode straight from the compressed
/// container.
///
/// # Example
///
/// ```no_run
/// use bamstream::bam::RecordReader;
/// use bamstream::bgzf::BgzfReader;
/// use std::io::BufReader;
///
/// # fn main() -> std::io::Result<()> {
/// # let source: &[u8] = &[];
/// let mut reader = RecordReader::new(BgzfReader::new(BufReader::new(source)))?;
/// println!("{} references", reader.header().reference_count());
///
/// for record in reader.records() {
///     let record = record?;
///     println!("{} {}", record.name, record.cigar_string());
/// }
/// # Ok(())
/// # }
/// ```
pub struct RecordReader<R> {
    reader: R,
    header: Header,
    buffer: Vec<u8>,
}

impl<R: Read> RecordReader<R> {
    /// Read the stream header and set up record framing.
    ///
    /// # Errors
    ///
    /// Fails if the magic bytes, header text, or reference dictionary
    /// cannot be read.
    pub fn new(mut reader: R) -> io::Result<Self> {
        let header = read_header(&mut reader)?;
        Ok(Self {
            reader,
            header,
            buffer: Vec::with_capacity(512),
        })
    }

    /// The stream header read during construction.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Read the next record, or `None` at clean EOF.
    pub fn read_record(&mut self) -> io::Result<Option<Record>> {
        let mut size_buf = [0u8; 4];
        match self.reader.read_exact(&mut size_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let declared = i32::from_le_bytes(size_buf);
        if declared < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid record length: {declared}"),
            ));
        }

        self.buffer.resize(declared as usize, 0);
        self.reader.read_exact(&mut self.buffer)?;

        parse_record(&self.buffer).map(Some)
    }

    /// Iterate over the remaining records.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }
}

/// Iterator over records, created by [`RecordReader::records`].
pub struct Records<'a, R> {
    reader: &'a mut RecordReader<R>,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
