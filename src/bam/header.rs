//! Stream header parsing.
//!
//! The decompressed stream opens with a small header before the first
//! record: the magic bytes `"BAM\x01"`, the SAM-style header text, and
//! the reference sequence dictionary. The dictionary gives the validator
//! its reference count and maps record reference ids to names.
//!
//! # Layout
//!
//! ```text
//! - magic: "BAM\x01" (4 bytes)
//! - l_text (int32), then l_text bytes of header text
//! - n_ref (int32), then per reference:
//!   - l_name (int32, includes NUL), name (NUL-terminated), l_ref (int32)
//! ```

use std::io::{self, Read};

/// Magic bytes opening the decompressed stream.
const MAGIC: &[u8; 4] = b"BAM\x01";

/// One reference sequence: a name and its length in bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Reference sequence name (e.g. "chr1").
    pub name: String,
    /// Reference sequence length in bases.
    pub length: u32,
}

/// The decoded stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header text (SAM `@`-lines), passed through uninterpreted.
    pub text: String,
    /// Reference dictionary in id order.
    pub references: Vec<Reference>,
}

impl Header {
    /// Number of references; the valid id range is `0..reference_count()`.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Name of the reference with the given id, if it exists.
    pub fn reference_name(&self, id: usize) -> Option<&str> {
        self.references.get(id).map(|r| r.name.as_str())
    }
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

fn read_len<R: Read>(reader: &mut R, what: &str) -> io::Result<usize> {
    let len = read_i32(reader)?;
    if len < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid {what}: {len}"),
        ));
    }
    Ok(len as usize)
}

fn read_reference<R: Read>(reader: &mut R) -> io::Result<Reference> {
    let name_len = read_len(reader, "reference name length")?;
    if name_len == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "reference name length is zero",
        ));
    }

    let mut name_bytes = vec![0u8; name_len];
    reader.read_exact(&mut name_bytes)?;
    if name_bytes.pop() != Some(0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "reference name not NUL-terminated",
        ));
    }

    let name = String::from_utf8(name_bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid UTF-8 in reference name: {e}"),
        )
    })?;

    let length = read_len(reader, "reference length")? as u32;

    Ok(Reference { name, length })
}

/// Read and validate the full stream header.
///
/// # Errors
///
/// Fails on a missing or wrong magic, a negative length field, a
/// reference name without its terminator, or non-UTF-8 text.
pub fn read_header<R: Read>(reader: &mut R) -> io::Result<Header> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid stream magic: expected {MAGIC:?}, got {magic:?}"),
        ));
    }

    let text_len = read_len(reader, "header text length")?;
    let mut text_bytes = vec![0u8; text_len];
    reader.read_exact(&mut text_bytes)?;
    let text = String::from_utf8(text_bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid UTF-8 in header text: {e}"),
        )
    })?;

    let n_ref = read_len(reader, "reference count")?;
    let mut references = Vec::with_capacity(n_ref.min(1024));
    for i in 0..n_ref {
        let reference = read_reference(reader).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("reference {i}: {e}"),
            )
        })?;
        references.push(reference);
    }

    Ok(Header { text, references })
}
