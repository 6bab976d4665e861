//! Tagged-field wire format encoding and decoding.
//!
//! The header region of every packet is a stream of tagged fields: a varint
//! tag `(field_number << 3) | wire_type` followed by a value laid out
//! according to the wire type.
//!
//! ```text
//! ┌───────────┬────────────────────────────────────┐
//! │ wire type │ value layout                       │
//! ├───────────┼────────────────────────────────────┤
//! │ 0         │ base-128 varint                    │
//! │ 1         │ 8 bytes, little-endian             │
//! │ 2         │ varint byte count + raw bytes      │
//! │ 3 / 4     │ group start / end (skip only)      │
//! │ 5         │ 4 bytes, little-endian             │
//! └───────────┴────────────────────────────────────┘
//! ```
//!
//! The encoder writes wire types 0, 1, 2 and 5 through the `put_*_field`
//! writers. The legacy group types 3 and 4 are never written; the decoder
//! understands them only far enough to step over them, so a field tagged by
//! an older peer does not break the record.
//!
//! Decoding is cursor-based and lazy: [`FieldReader`] yields one
//! `(field_number, wire_type)` pair at a time, and the caller either consumes
//! the value through a typed accessor or steps over it with
//! [`FieldReader::skip_field`].

use crate::error::{PackwireError, Result};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Physical layout selector carried in the low three bits of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint value.
    Varint = 0,
    /// Fixed 8-byte little-endian value.
    Fixed64 = 1,
    /// Varint byte count followed by that many raw bytes.
    LengthDelimited = 2,
    /// Legacy group start; never written, only skipped.
    StartGroup = 3,
    /// Legacy group end; terminates a group skip.
    EndGroup = 4,
    /// Fixed 4-byte little-endian value.
    Fixed32 = 5,
}

impl WireType {
    /// Decodes the low three bits of a tag, `None` for the two unassigned
    /// values 6 and 7.
    pub fn from_raw(raw: u8) -> Option<WireType> {
        match raw {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// Appends `value` as a base-128 varint, least significant group first.
///
/// Every byte but the last carries the continuation bit; zero encodes as a
/// single `0x00`.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push(value as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Encoded length of `value` as a varint, without emitting anything.
///
/// Agrees byte-for-byte with [`encode_varint`] for every input.
pub fn varint_len(mut value: u64) -> usize {
    let mut n = 1;
    while value >= 0x80 {
        value >>= 7;
        n += 1;
    }
    n
}

/// Decodes a varint starting at `offset`.
///
/// Returns the value and the offset of the first byte past it. Fails with
/// `IntegerOverflow` once an eleventh continuation group would be needed and
/// with `UnexpectedEndOfInput` if the buffer ends mid-sequence.
pub fn decode_varint(buf: &[u8], mut offset: usize) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        if shift >= 64 {
            return Err(PackwireError::IntegerOverflow { offset });
        }
        let byte = match buf.get(offset) {
            Some(&byte) => byte,
            None => return Err(PackwireError::UnexpectedEndOfInput { offset }),
        };
        offset += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, offset));
        }
        shift += 7;
    }
}

/// Appends the tag for `field` with layout `wire`.
///
/// `field` must be positive and `wire` one of the four encodable layouts;
/// group tags are never produced.
pub fn encode_tag(field: i32, wire: WireType, buf: &mut Vec<u8>) {
    debug_assert!(field > 0, "field numbers start at 1");
    debug_assert!(
        !matches!(wire, WireType::StartGroup | WireType::EndGroup),
        "group tags are not encodable"
    );
    encode_varint((field as u64) << 3 | wire as u64, buf);
}

/// Appends a varint field: tag followed by the value.
pub fn put_varint_field(field: i32, value: u64, buf: &mut Vec<u8>) {
    encode_tag(field, WireType::Varint, buf);
    encode_varint(value, buf);
}

/// Appends a length-prefixed field: tag, byte count, raw bytes.
pub fn put_bytes_field(field: i32, value: &[u8], buf: &mut Vec<u8>) {
    encode_tag(field, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.extend_from_slice(value);
}

/// Appends a fixed 4-byte field, little-endian.
pub fn put_fixed32_field(field: i32, value: u32, buf: &mut Vec<u8>) {
    encode_tag(field, WireType::Fixed32, buf);
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Appends a fixed 8-byte field, little-endian.
pub fn put_fixed64_field(field: i32, value: u64, buf: &mut Vec<u8>) {
    encode_tag(field, WireType::Fixed64, buf);
    buf.extend_from_slice(&value.to_le_bytes());
}

/// A decoded field value, borrowed from the input buffer where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue<'a> {
    /// Wire type 0.
    Varint(u64),
    /// Wire type 1.
    Fixed64(u64),
    /// Wire type 2.
    Bytes(&'a [u8]),
    /// Wire type 5.
    Fixed32(u32),
    /// Wire type 3: the raw content between a group's delimiters.
    Group(&'a [u8]),
}

/// Lazy cursor over a tagged-field record.
///
/// [`next_field`](FieldReader::next_field) decodes the next tag; the caller
/// dispatches on the field number and either reads the value with the
/// accessor matching the wire type (or [`read_value`](FieldReader::read_value)
/// generically) or steps over it with [`skip_field`](FieldReader::skip_field).
/// When the same field number occurs more than once, reading them in order
/// naturally leaves the last occurrence in effect.
///
/// # Example
///
/// ```
/// use packwire::protocol::{put_varint_field, FieldReader, WireType};
///
/// let mut buf = Vec::new();
/// put_varint_field(1, 7, &mut buf);
///
/// let mut reader = FieldReader::new(&buf);
/// let (field, wire) = reader.next_field().unwrap().unwrap();
/// assert_eq!((field, wire), (1, WireType::Varint));
/// assert_eq!(reader.read_varint().unwrap(), 7);
/// assert!(reader.is_at_end());
/// ```
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> FieldReader<'a> {
        FieldReader { buf, pos: 0 }
    }

    /// Current cursor offset into the record.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once the cursor has consumed the whole record.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Decodes the next tag, or `None` at the end of the record.
    ///
    /// At record level an end-group tag has nothing to close and is
    /// rejected, a non-positive field number is a malformed tag, and wire
    /// types 6 and 7 are unsupported, in that order of precedence.
    pub fn next_field(&mut self) -> Result<Option<(i32, WireType)>> {
        if self.is_at_end() {
            return Ok(None);
        }
        let tag_at = self.pos;
        let (tag, next) = decode_varint(self.buf, self.pos)?;
        self.pos = next;
        let raw_wire = (tag & 0x7) as u8;
        if raw_wire == WireType::EndGroup as u8 {
            return Err(PackwireError::EndGroupWithoutStart { offset: tag_at });
        }
        // Field numbers wrap like a 32-bit decoder's, so oversized tags
        // fail the same sign check as field zero.
        let field = (tag >> 3) as i32;
        if field <= 0 {
            return Err(PackwireError::MalformedTag {
                field,
                offset: tag_at,
            });
        }
        match WireType::from_raw(raw_wire) {
            Some(wire) => Ok(Some((field, wire))),
            None => Err(PackwireError::UnsupportedWireType {
                wire_type: raw_wire,
                offset: tag_at,
            }),
        }
    }

    /// Reads a wire type 0 value.
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, next) = decode_varint(self.buf, self.pos)?;
        self.pos = next;
        Ok(value)
    }

    /// Reads a wire type 5 value.
    pub fn read_fixed32(&mut self) -> Result<u32> {
        let raw = self.read_exact::<4>()?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Reads a wire type 1 value.
    pub fn read_fixed64(&mut self) -> Result<u64> {
        let raw = self.read_exact::<8>()?;
        Ok(u64::from_le_bytes(raw))
    }

    /// Reads a wire type 2 value: a varint byte count followed by that many
    /// raw bytes, borrowed from the input.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len_at = self.pos;
        let (declared, next) = decode_varint(self.buf, self.pos)?;
        let len = match usize::try_from(declared) {
            Ok(len) if declared <= i64::MAX as u64 => len,
            _ => return Err(PackwireError::NegativeLength { offset: len_at }),
        };
        let remaining = self.buf.len() - next;
        if len > remaining {
            return Err(PackwireError::TruncatedInput {
                offset: next,
                needed: len,
                remaining,
            });
        }
        let end = next + len;
        let bytes = &self.buf[next..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Reads the value for `wire` as a [`RawValue`].
    ///
    /// A start-group tag yields the group's raw content with the cursor
    /// advanced past its end tag; an end-group tag is rejected just as in
    /// [`next_field`](FieldReader::next_field).
    pub fn read_value(&mut self, wire: WireType) -> Result<RawValue<'a>> {
        match wire {
            WireType::Varint => Ok(RawValue::Varint(self.read_varint()?)),
            WireType::Fixed64 => Ok(RawValue::Fixed64(self.read_fixed64()?)),
            WireType::LengthDelimited => Ok(RawValue::Bytes(self.read_bytes()?)),
            WireType::Fixed32 => Ok(RawValue::Fixed32(self.read_fixed32()?)),
            WireType::StartGroup => Ok(RawValue::Group(self.skip_group()?)),
            WireType::EndGroup => Err(PackwireError::EndGroupWithoutStart { offset: self.pos }),
        }
    }

    /// Steps over the value for `wire` without interpreting it.
    ///
    /// Group content is skipped in full, including nested groups, until the
    /// matching end tag.
    pub fn skip_field(&mut self, wire: WireType) -> Result<()> {
        match wire {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.read_fixed64()?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::Fixed32 => {
                self.read_fixed32()?;
            }
            WireType::StartGroup => {
                self.skip_group()?;
            }
            WireType::EndGroup => {
                return Err(PackwireError::EndGroupWithoutStart { offset: self.pos });
            }
        }
        Ok(())
    }

    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        if end > self.buf.len() {
            return Err(PackwireError::UnexpectedEndOfInput {
                offset: self.buf.len(),
            });
        }
        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(raw)
    }

    /// Consumes a group body through its matching end tag and returns the
    /// raw content between the delimiters. Inside a group, end-group tags
    /// close the innermost open group instead of being an error.
    fn skip_group(&mut self) -> Result<&'a [u8]> {
        let content_start = self.pos;
        let mut content_end = self.pos;
        let mut depth = 1u32;
        while depth > 0 {
            if self.is_at_end() {
                return Err(PackwireError::UnexpectedEndOfInput {
                    offset: self.buf.len(),
                });
            }
            let tag_at = self.pos;
            let (tag, next) = decode_varint(self.buf, self.pos)?;
            self.pos = next;
            let raw_wire = (tag & 0x7) as u8;
            match WireType::from_raw(raw_wire) {
                Some(WireType::StartGroup) => depth += 1,
                Some(WireType::EndGroup) => {
                    depth -= 1;
                    content_end = tag_at;
                }
                Some(WireType::Varint) => {
                    self.read_varint()?;
                }
                Some(WireType::Fixed64) => {
                    self.read_fixed64()?;
                }
                Some(WireType::LengthDelimited) => {
                    self.read_bytes()?;
                }
                Some(WireType::Fixed32) => {
                    self.read_fixed32()?;
                }
                None => {
                    return Err(PackwireError::UnsupportedWireType {
                        wire_type: raw_wire,
                        offset: tag_at,
                    });
                }
            }
        }
        Ok(&self.buf[content_start..content_end])
    }
}
