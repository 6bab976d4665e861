//! Packet - the unit of exchange between peers.
//!
//! A packet couples a [`Header`] with an opaque body and the codec ids
//! negotiated for each region. The header region always uses the
//! tagged-field wire format; the body region is delegated to whichever
//! codec the packet's body codec id names in the global
//! [`CodecRegistry`]. Length bookkeeping (`header_length`, `body_length`,
//! `length`) is kept current by the encode and decode calls so an outer
//! transport can frame the regions without re-measuring them.
//!
//! A packet is owned by exactly one caller at a time. There is no
//! internal locking; hand a packet to another thread by moving it.
//!
//! # Example
//!
//! ```
//! use packwire::{Packet, PacketSetting};
//! use serde_json::json;
//!
//! let mut packet = Packet::new();
//! packet.reset(None, [PacketSetting::BodyCodec("json".into())])?;
//! packet.header_mut().seq = 7;
//! packet.header_mut().uri = "/ping".to_string();
//! packet.set_body(Box::new(json!({"ok": true})));
//!
//! let header = packet.encode_header();
//! let body = packet.encode_body()?;
//! assert_eq!(packet.length(), (header.len() + body.len()) as u64);
//! # Ok::<(), packwire::PackwireError>(())
//! ```

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::codec::{Body, CodecRegistry, RegisteredCodec, NIL_CODEC_ID};
use crate::error::Result;
use crate::protocol::header::Header;

/// Lazily produces a body for the read path.
///
/// Invoked at most once, with the fully decoded header, so the callback
/// can pick the body shape from `uri` or `message_type`.
pub type BodyResolver = Box<dyn FnOnce(&Header) -> Body + Send>;

/// One configuration step applied while acquiring or resetting a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketSetting {
    /// Select the header codec by registered name.
    HeaderCodec(String),
    /// Select the body codec by registered name.
    BodyCodec(String),
    /// Set the gzip compression level carried in the header.
    BodyGzip(i32),
}

/// A header plus an opaque body, with codec selection and length
/// bookkeeping for both regions.
#[derive(Default)]
pub struct Packet {
    header: Header,
    header_codec: u8,
    body_codec: u8,
    body: Option<Body>,
    body_resolver: Option<BodyResolver>,
    header_length: u64,
    body_length: u64,
    length: u64,
}

impl Packet {
    /// Creates a packet with every field unset.
    pub fn new() -> Packet {
        Packet::default()
    }

    /// Returns the packet to its unset state, stores `resolver`, then
    /// applies `settings` in order.
    ///
    /// A failing setting aborts the remainder and propagates; the fields
    /// already cleared stay cleared.
    pub fn reset<S>(&mut self, resolver: Option<BodyResolver>, settings: S) -> Result<()>
    where
        S: IntoIterator<Item = PacketSetting>,
    {
        self.clear();
        self.body_resolver = resolver;
        self.apply(settings)
    }

    /// Clears every field. Header string capacity is kept for reuse.
    pub fn clear(&mut self) {
        self.header.reset();
        self.header_codec = NIL_CODEC_ID;
        self.body_codec = NIL_CODEC_ID;
        self.body = None;
        self.body_resolver = None;
        self.header_length = 0;
        self.body_length = 0;
        self.length = 0;
    }

    /// Applies `settings` in order, stopping at the first failure.
    pub fn apply<S>(&mut self, settings: S) -> Result<()>
    where
        S: IntoIterator<Item = PacketSetting>,
    {
        for setting in settings {
            match setting {
                PacketSetting::HeaderCodec(name) => self.set_header_codec_by_name(&name)?,
                PacketSetting::BodyCodec(name) => self.set_body_codec_by_name(&name)?,
                PacketSetting::BodyGzip(level) => self.header.gzip_level = level,
            }
        }
        Ok(())
    }

    /// The decoded or to-be-encoded header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable access to the header.
    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Wire id of the selected header codec, 0 when unset.
    #[inline]
    pub fn header_codec(&self) -> u8 {
        self.header_codec
    }

    /// Wire id of the selected body codec, 0 when unset.
    #[inline]
    pub fn body_codec(&self) -> u8 {
        self.body_codec
    }

    /// Selects the header codec by wire id, without registry validation.
    #[inline]
    pub fn set_header_codec(&mut self, id: u8) {
        self.header_codec = id;
    }

    /// Selects the body codec by wire id, without registry validation.
    #[inline]
    pub fn set_body_codec(&mut self, id: u8) {
        self.body_codec = id;
    }

    /// Selects the header codec by registered name.
    pub fn set_header_codec_by_name(&mut self, name: &str) -> Result<()> {
        self.header_codec = CodecRegistry::global().by_name(name)?.id();
        Ok(())
    }

    /// Selects the body codec by registered name.
    pub fn set_body_codec_by_name(&mut self, name: &str) -> Result<()> {
        self.body_codec = CodecRegistry::global().by_name(name)?.id();
        Ok(())
    }

    /// Registered name of the selected header codec, empty when unset or
    /// unknown.
    pub fn header_codec_name(&self) -> String {
        codec_name(self.header_codec)
    }

    /// Registered name of the selected body codec, empty when unset or
    /// unknown.
    pub fn body_codec_name(&self) -> String {
        codec_name(self.body_codec)
    }

    /// The body, if one is set or has been resolved.
    #[inline]
    pub fn body(&self) -> Option<&(dyn Any + Send)> {
        self.body.as_deref()
    }

    /// Sets the body directly, discarding any pending resolver.
    pub fn set_body(&mut self, body: Body) {
        self.body_resolver = None;
        self.body = Some(body);
    }

    /// Takes the body out of the packet.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Stores a resolver for the read path, discarding any direct body.
    pub fn set_body_resolver(&mut self, resolver: BodyResolver) {
        self.body = None;
        self.body_resolver = Some(resolver);
    }

    /// Runs the pending resolver against the current header, caching its
    /// result as the body. Later calls return the cached body.
    ///
    /// Call this on the read path only, after the header region has been
    /// decoded.
    pub fn resolve_body(&mut self) -> Option<&(dyn Any + Send)> {
        if let Some(resolver) = self.body_resolver.take() {
            let body = resolver(&self.header);
            self.body = Some(body);
        }
        self.body.as_deref()
    }

    /// Encoded size of the header region from the last encode or decode.
    #[inline]
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// Encoded size of the body region from the last encode or decode.
    #[inline]
    pub fn body_length(&self) -> u64 {
        self.body_length
    }

    /// Combined size of both regions.
    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Encodes the header region and records its length.
    pub fn encode_header(&mut self) -> Bytes {
        let buf = self.header.encode();
        self.header_length = buf.len() as u64;
        self.length = self.header_length + self.body_length;
        buf
    }

    /// Decodes the header region in place and records its length.
    pub fn decode_header(&mut self, buf: &[u8]) -> Result<()> {
        self.header.decode_from(buf)?;
        self.header_length = buf.len() as u64;
        self.length = self.header_length + self.body_length;
        Ok(())
    }

    /// Encodes the body region with the selected body codec and records
    /// its length.
    ///
    /// The codec is resolved before any byte is produced, so an unset or
    /// unknown body codec fails with `CodecNotFound` even when there is
    /// no body. A packet without a body encodes to an empty region.
    pub fn encode_body(&mut self) -> Result<Bytes> {
        let codec = self.resolved_body_codec()?;
        let buf = match self.body.as_deref() {
            Some(body) => Bytes::from(codec.encode(body)?),
            None => Bytes::new(),
        };
        self.body_length = buf.len() as u64;
        self.length = self.header_length + self.body_length;
        Ok(buf)
    }

    /// Decodes the body region with the selected body codec and records
    /// its length.
    ///
    /// An empty region clears the body without consulting the registry.
    pub fn decode_body(&mut self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            self.body = None;
            self.body_length = 0;
            self.length = self.header_length;
            return Ok(());
        }
        let codec = self.resolved_body_codec()?;
        let body = codec.decode(buf)?;
        self.body_resolver = None;
        self.body = Some(body);
        self.body_length = buf.len() as u64;
        self.length = self.header_length + self.body_length;
        Ok(())
    }

    fn resolved_body_codec(&self) -> Result<RegisteredCodec> {
        CodecRegistry::global().by_id(self.body_codec)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.header)
            .field("header_codec", &self.header_codec)
            .field("body_codec", &self.body_codec)
            .field("has_body", &self.body.is_some())
            .field("has_resolver", &self.body_resolver.is_some())
            .field("length", &self.length)
            .finish()
    }
}

#[derive(Serialize)]
struct PacketView<'a> {
    #[serde(flatten)]
    header: &'a Header,
    #[serde(skip_serializing_if = "String::is_empty")]
    header_codec: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    body_codec: String,
    length: u64,
    has_body: bool,
}

/// One-line JSON rendering for logs; the body itself is not shown.
impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = PacketView {
            header: &self.header,
            header_codec: self.header_codec_name(),
            body_codec: self.body_codec_name(),
            length: self.length,
            has_body: self.body.is_some(),
        };
        let rendered = serde_json::to_string(&view).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

fn codec_name(id: u8) -> String {
    CodecRegistry::global()
        .by_id(id)
        .map(|codec| codec.name().to_string())
        .unwrap_or_default()
}
