//! Typed optional tag decoding.
//!
//! Tags annotate a record with short self-typed key/value pairs (edit
//! distance, alignment score, read group, ...). Each entry is a
//! 2-character name, a 1-character type code, and a value whose width is
//! governed by the type code — a small closed type system of 11 codes:
//!
//! | code | value | width |
//! |------|-------|-------|
//! | `A` | character | 1 |
//! | `c`/`C` | signed/unsigned 8-bit | 1 |
//! | `s`/`S` | signed/unsigned 16-bit | 2 |
//! | `i`/`I` | signed/unsigned 32-bit | 4 |
//! | `f` | 32-bit float | 4 |
//! | `Z`/`H` | text / hex text | to NUL |
//! | `B` | numeric array | 5 + count × element |
//!
//! Decoding is deliberately soft: an unknown type code, a truncated
//! value, or an array overrunning the buffer ends the tag list early and
//! keeps what was decoded — a mangled trailing tag must not invalidate
//! the whole record. The [`Tags::truncated`] flag distinguishes the two
//! outcomes.

use log::debug;
use std::fmt;

/// The closed set of tag value type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    /// `A` — single printable character.
    Char,
    /// `c` — signed 8-bit integer.
    Int8,
    /// `C` — unsigned 8-bit integer.
    UInt8,
    /// `s` — signed 16-bit integer.
    Int16,
    /// `S` — unsigned 16-bit integer.
    UInt16,
    /// `i` — signed 32-bit integer.
    Int32,
    /// `I` — unsigned 32-bit integer.
    UInt32,
    /// `f` — 32-bit float.
    Float,
    /// `Z` — NUL-terminated text.
    Text,
    /// `H` — NUL-terminated hex text.
    Hex,
    /// `B` — typed numeric array.
    Array,
}

impl TagType {
    /// Map a type-code byte to its tag type, or `None` for anything
    /// outside the closed set.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'A' => Some(Self::Char),
            b'c' => Some(Self::Int8),
            b'C' => Some(Self::UInt8),
            b's' => Some(Self::Int16),
            b'S' => Some(Self::UInt16),
            b'i' => Some(Self::Int32),
            b'I' => Some(Self::UInt32),
            b'f' => Some(Self::Float),
            b'Z' => Some(Self::Text),
            b'H' => Some(Self::Hex),
            b'B' => Some(Self::Array),
            _ => None,
        }
    }

    /// The type-code byte.
    pub fn code(&self) -> u8 {
        match self {
            Self::Char => b'A',
            Self::Int8 => b'c',
            Self::UInt8 => b'C',
            Self::Int16 => b's',
            Self::UInt16 => b'S',
            Self::Int32 => b'i',
            Self::UInt32 => b'I',
            Self::Float => b'f',
            Self::Text => b'Z',
            Self::Hex => b'H',
            Self::Array => b'B',
        }
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Single character (`A`).
    Char(char),
    /// Any of the six integer widths, widened to i64.
    Int(i64),
    /// 32-bit float (`f`).
    Float(f32),
    /// Text (`Z`), terminator excluded.
    Text(String),
    /// Hex text (`H`), terminator excluded.
    Hex(String),
    /// Numeric array (`B`).
    Array(ArrayValue),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Char(c) => write!(f, "{c}"),
            TagValue::Int(n) => write!(f, "{n}"),
            TagValue::Float(x) => write!(f, "{x}"),
            TagValue::Text(s) | TagValue::Hex(s) => write!(f, "{s}"),
            TagValue::Array(a) => write!(f, "{a}"),
        }
    }
}

/// A numeric array value, keeping its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    /// `B,c` — signed 8-bit elements.
    Int8(Vec<i8>),
    /// `B,C` — unsigned 8-bit elements.
    UInt8(Vec<u8>),
    /// `B,s` — signed 16-bit elements.
    Int16(Vec<i16>),
    /// `B,S` — unsigned 16-bit elements.
    UInt16(Vec<u16>),
    /// `B,i` — signed 32-bit elements.
    Int32(Vec<i32>),
    /// `B,I` — unsigned 32-bit elements.
    UInt32(Vec<u32>),
    /// `B,f` — 32-bit float elements.
    Float(Vec<f32>),
}

impl ArrayValue {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Int8(v) => v.len(),
            ArrayValue::UInt8(v) => v.len(),
            ArrayValue::Int16(v) => v.len(),
            ArrayValue::UInt16(v) => v.len(),
            ArrayValue::Int32(v) => v.len(),
            ArrayValue::UInt32(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
        }
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayValue::Int8(v) => write_joined(f, v),
            ArrayValue::UInt8(v) => write_joined(f, v),
            ArrayValue::Int16(v) => write_joined(f, v),
            ArrayValue::UInt16(v) => write_joined(f, v),
            ArrayValue::Int32(v) => write_joined(f, v),
            ArrayValue::UInt32(v) => write_joined(f, v),
            ArrayValue::Float(v) => write_joined(f, v),
        }
    }
}

/// One decoded tag entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Two-character tag name.
    pub name: [u8; 2],
    /// The tag's declared type.
    pub tag_type: TagType,
    /// The decoded value.
    pub value: TagValue,
}

impl Tag {
    /// The tag name as printable text.
    pub fn name_str(&self) -> String {
        format!("{}{}", self.name[0] as char, self.name[1] as char)
    }
}

/// The decoded tag list, with its soft-failure outcome.
///
/// `truncated` is set when decoding stopped before cleanly consuming the
/// whole tag region — the entries present are still valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tags {
    /// Tags in stream order.
    pub entries: Vec<Tag>,
    /// Whether trailing bytes were dropped as undecodable.
    pub truncated: bool,
}

impl Tags {
    /// An empty, cleanly-terminated tag list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a tag by its two-character name.
    pub fn get(&self, name: &[u8; 2]) -> Option<&Tag> {
        self.entries.iter().find(|tag| tag.name == *name)
    }

    /// Number of decoded tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tags were decoded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode the tag region of a record.
///
/// Never fails: decoding stops at the first undecodable entry and
/// returns everything before it, with [`Tags::truncated`] set when the
/// region was not cleanly consumed.
///
/// # Example
///
/// ```
/// use bamstream::bam::{parse_tags, TagValue};
///
/// // NM:i:-5 followed by bytes too short to be another tag.
/// let mut data = b"NMi".to_vec();
/// data.extend_from_slice(&(-5i32).to_le_bytes());
/// data.extend_from_slice(b"XY");
/// let tags = parse_tags(&data);
/// assert_eq!(tags.len(), 1);
/// assert_eq!(tags.entries[0].value, TagValue::Int(-5));
/// assert!(tags.truncated);
/// ```
pub fn parse_tags(data: &[u8]) -> Tags {
    let mut entries = Vec::new();
    let mut pos = 0;

    while data.len() - pos >= 3 {
        let name = [data[pos], data[pos + 1]];
        let Some(tag_type) = TagType::from_code(data[pos + 2]) else {
            debug!(
                "unsupported tag type code {:#04x} at offset {pos}, keeping {} tags",
                data[pos + 2],
                entries.len()
            );
            break;
        };

        let mut cursor = pos + 3;
        let Some(value) = decode_value(data, &mut cursor, tag_type) else {
            debug!(
                "truncated {}{} tag at offset {pos}, keeping {} tags",
                name[0] as char,
                name[1] as char,
                entries.len()
            );
            break;
        };

        entries.push(Tag {
            name,
            tag_type,
            value,
        });
        pos = cursor;
    }

    Tags {
        entries,
        truncated: pos < data.len(),
    }
}

fn take<'a>(data: &'a [u8], cursor: &mut usize, n: usize) -> Option<&'a [u8]> {
    let end = cursor.checked_add(n)?;
    let bytes = data.get(*cursor..end)?;
    *cursor = end;
    Some(bytes)
}

/// Decode a NUL-terminated string; the terminator is consumed but not
/// part of the value.
fn take_nul_terminated(data: &[u8], cursor: &mut usize) -> Option<String> {
    let rest = &data[*cursor..];
    let nul = rest.iter().position(|&b| b == 0)?;
    let text = String::from_utf8_lossy(&rest[..nul]).into_owned();
    *cursor += nul + 1;
    Some(text)
}

fn decode_value(data: &[u8], cursor: &mut usize, tag_type: TagType) -> Option<TagValue> {
    match tag_type {
        TagType::Char => take(data, cursor, 1).map(|b| TagValue::Char(b[0] as char)),
        TagType::Int8 => take(data, cursor, 1).map(|b| TagValue::Int(b[0] as i8 as i64)),
        TagType::UInt8 => take(data, cursor, 1).map(|b| TagValue::Int(b[0] as i64)),
        TagType::Int16 => take(data, cursor, 2)
            .map(|b| TagValue::Int(i16::from_le_bytes([b[0], b[1]]) as i64)),
        TagType::UInt16 => take(data, cursor, 2)
            .map(|b| TagValue::Int(u16::from_le_bytes([b[0], b[1]]) as i64)),
        TagType::Int32 => take(data, cursor, 4)
            .map(|b| TagValue::Int(i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)),
        TagType::UInt32 => take(data, cursor, 4)
            .map(|b| TagValue::Int(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)),
        TagType::Float => take(data, cursor, 4)
            .map(|b| TagValue::Float(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
        TagType::Text => take_nul_terminated(data, cursor).map(TagValue::Text),
        TagType::Hex => take_nul_terminated(data, cursor).map(TagValue::Hex),
        TagType::Array => decode_array(data, cursor).map(TagValue::Array),
    }
}

fn decode_array(data: &[u8], cursor: &mut usize) -> Option<ArrayValue> {
    let head = take(data, cursor, 5)?;
    let elem_code = head[0];
    let count = u32::from_le_bytes([head[1], head[2], head[3], head[4]]) as usize;

    let width = match elem_code {
        b'c' | b'C' => 1,
        b's' | b'S' => 2,
        b'i' | b'I' | b'f' => 4,
        _ => return None,
    };

    let total = count.checked_mul(width)?;
    let body = take(data, cursor, total)?;

    match elem_code {
        b'c' => Some(ArrayValue::Int8(body.iter().map(|&b| b as i8).collect())),
        b'C' => Some(ArrayValue::UInt8(body.to_vec())),
        b's' => Some(ArrayValue::Int16(
            body.chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]))
                .collect(),
        )),
        b'S' => Some(ArrayValue::UInt16(
            body.chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        )),
        b'i' => Some(ArrayValue::Int32(
            body.chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )),
        b'I' => Some(ArrayValue::UInt32(
            body.chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )),
        b'f' => Some(ArrayValue::Float(
            body.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )),
        _ => None,
    }
}
