//! Protocol module - wire format, header record, packets, and pooling.
//!
//! This module implements the framing layer:
//! - Varint and tagged-field primitives for the binary wire format
//! - The header record with its fixed field numbering
//! - The packet container tying a header to an opaque body
//! - A free-list pool for packet reuse

mod header;
mod packet;
mod pool;
mod wire_format;

pub use header::Header;
pub use packet::{BodyResolver, Packet, PacketSetting};
pub use pool::{acquire, release, PacketPool};
pub use wire_format::{
    decode_varint, encode_tag, encode_varint, put_bytes_field, put_fixed32_field,
    put_fixed64_field, put_varint_field, varint_len, FieldReader, RawValue, WireType,
    MAX_VARINT_LEN,
};
