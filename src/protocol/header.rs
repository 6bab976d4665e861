//! The structured header record carried in front of every packet body.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{PackwireError, Result};
use crate::protocol::wire_format::{
    put_bytes_field, put_varint_field, varint_len, FieldReader, WireType,
};

const FIELD_SEQ: i32 = 1;
const FIELD_MESSAGE_TYPE: i32 = 2;
const FIELD_URI: i32 = 3;
const FIELD_GZIP_LEVEL: i32 = 4;
const FIELD_STATUS_CODE: i32 = 5;
const FIELD_STATUS: i32 = 6;

/// The six-field record prefixed to every packet.
///
/// Encoding is zero-omitting: a field at its zero or empty value never
/// appears on the wire, and decoding leaves absent fields at zero. Field
/// numbers 1 through 6 are stable; anything else in the record is skipped so
/// a newer peer can extend it.
///
/// The `Serialize` impl exists for log rendering (see
/// [`Packet`](crate::Packet)'s `Display`); zero fields are omitted there
/// too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Correlates a request with its response (field 1).
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub seq: u64,
    /// Message kind; the meaning of each value is owned by the surrounding
    /// protocol layer (field 2).
    #[serde(rename = "type", skip_serializing_if = "is_zero_i32")]
    pub message_type: i32,
    /// Target operation or resource (field 3).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    /// Compression-level hint consumed by an external compressor, 0 = none
    /// (field 4).
    #[serde(rename = "gzip", skip_serializing_if = "is_zero_i32")]
    pub gzip_level: i32,
    /// Result code (field 5).
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub status_code: i32,
    /// Human-readable status text (field 6).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

/// Sign-extend a signed field for the wire, so negative values take the
/// full ten varint bytes and survive the round trip.
#[inline]
fn widen(value: i32) -> u64 {
    value as i64 as u64
}

impl Header {
    /// Creates an all-zero header.
    pub fn new() -> Header {
        Header::default()
    }

    /// True when every field is at its zero value.
    pub fn is_empty(&self) -> bool {
        self.seq == 0
            && self.message_type == 0
            && self.uri.is_empty()
            && self.gzip_level == 0
            && self.status_code == 0
            && self.status.is_empty()
    }

    /// Restores every field to its zero value in place.
    ///
    /// String capacity is kept, so a pooled header does not reallocate on
    /// its next use.
    pub fn reset(&mut self) {
        self.seq = 0;
        self.message_type = 0;
        self.uri.clear();
        self.gzip_level = 0;
        self.status_code = 0;
        self.status.clear();
    }

    /// Exact byte length [`encode`](Header::encode) would produce.
    pub fn encoded_len(&self) -> usize {
        let mut n = 0;
        if self.seq != 0 {
            n += 1 + varint_len(self.seq);
        }
        if self.message_type != 0 {
            n += 1 + varint_len(widen(self.message_type));
        }
        if !self.uri.is_empty() {
            n += 1 + varint_len(self.uri.len() as u64) + self.uri.len();
        }
        if self.gzip_level != 0 {
            n += 1 + varint_len(widen(self.gzip_level));
        }
        if self.status_code != 0 {
            n += 1 + varint_len(widen(self.status_code));
        }
        if !self.status.is_empty() {
            n += 1 + varint_len(self.status.len() as u64) + self.status.len();
        }
        n
    }

    /// Encodes the header, omitting every zero and empty field.
    ///
    /// An all-zero header encodes to an empty buffer.
    ///
    /// # Example
    ///
    /// ```
    /// use packwire::Header;
    ///
    /// let mut header = Header::new();
    /// header.seq = 7;
    /// header.uri = "/ping".to_string();
    /// let bytes = header.encode();
    /// assert_eq!(Header::decode(&bytes).unwrap(), header);
    /// ```
    pub fn encode(&self) -> Bytes {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        Bytes::from(buf)
    }

    /// Appends the encoded header to `buf`, fields in ascending number
    /// order.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        if self.seq != 0 {
            put_varint_field(FIELD_SEQ, self.seq, buf);
        }
        if self.message_type != 0 {
            put_varint_field(FIELD_MESSAGE_TYPE, widen(self.message_type), buf);
        }
        if !self.uri.is_empty() {
            put_bytes_field(FIELD_URI, self.uri.as_bytes(), buf);
        }
        if self.gzip_level != 0 {
            put_varint_field(FIELD_GZIP_LEVEL, widen(self.gzip_level), buf);
        }
        if self.status_code != 0 {
            put_varint_field(FIELD_STATUS_CODE, widen(self.status_code), buf);
        }
        if !self.status.is_empty() {
            put_bytes_field(FIELD_STATUS, self.status.as_bytes(), buf);
        }
    }

    /// Decodes a header from `buf`.
    pub fn decode(buf: &[u8]) -> Result<Header> {
        let mut header = Header::default();
        header.decode_from(buf)?;
        Ok(header)
    }

    /// Decodes into `self`, reusing its allocations.
    ///
    /// Starts from the all-zero state regardless of previous contents. A
    /// field number that repeats keeps its last decoded value; unknown
    /// field numbers are skipped; a known field carrying the wrong wire
    /// type is rejected.
    pub fn decode_from(&mut self, buf: &[u8]) -> Result<()> {
        self.reset();
        let mut reader = FieldReader::new(buf);
        while let Some((field, wire)) = reader.next_field()? {
            match field {
                FIELD_SEQ => {
                    expect_wire(field, wire, WireType::Varint, &reader)?;
                    self.seq = reader.read_varint()?;
                }
                FIELD_MESSAGE_TYPE => {
                    expect_wire(field, wire, WireType::Varint, &reader)?;
                    self.message_type = reader.read_varint()? as i32;
                }
                FIELD_URI => {
                    expect_wire(field, wire, WireType::LengthDelimited, &reader)?;
                    set_lossy(&mut self.uri, reader.read_bytes()?);
                }
                FIELD_GZIP_LEVEL => {
                    expect_wire(field, wire, WireType::Varint, &reader)?;
                    self.gzip_level = reader.read_varint()? as i32;
                }
                FIELD_STATUS_CODE => {
                    expect_wire(field, wire, WireType::Varint, &reader)?;
                    self.status_code = reader.read_varint()? as i32;
                }
                FIELD_STATUS => {
                    expect_wire(field, wire, WireType::LengthDelimited, &reader)?;
                    set_lossy(&mut self.status, reader.read_bytes()?);
                }
                _ => reader.skip_field(wire)?,
            }
        }
        Ok(())
    }
}

fn expect_wire(field: i32, wire: WireType, want: WireType, reader: &FieldReader<'_>) -> Result<()> {
    if wire == want {
        Ok(())
    } else {
        Err(PackwireError::WrongWireType {
            field,
            wire_type: wire as u8,
            offset: reader.position(),
        })
    }
}

/// Replaces `dst` with `bytes`, reusing its buffer. String fields are raw
/// bytes on the wire; invalid UTF-8 is replaced rather than rejected.
fn set_lossy(dst: &mut String, bytes: &[u8]) {
    dst.clear();
    match std::str::from_utf8(bytes) {
        Ok(text) => dst.push_str(text),
        Err(_) => dst.push_str(&String::from_utf8_lossy(bytes)),
    }
}
