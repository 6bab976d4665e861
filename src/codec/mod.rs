//! Codec module - pluggable body serialization and the codec registry.
//!
//! A codec is a named, numerically-identified capability for turning an
//! opaque body value into bytes and back:
//!
//! - [`JsonCodec`] - JSON using `serde_json`
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (to_vec_named, map format)
//! - [`RawCodec`] - pass-through for already-serialized or binary bodies
//!
//! All three are registered in the global [`CodecRegistry`] at bootstrap;
//! applications add their own codecs with explicit
//! [`register`](CodecRegistry::register) calls. The byte id travels on the
//! wire, the name is for configuration.
//!
//! # Design
//!
//! Bodies are application-defined, so they cross this boundary as
//! `Box<dyn Any + Send>`. Each codec declares which concrete types it can
//! encode and downcasts to them; decoding produces a self-describing value
//! (for the serde codecs, a `serde_json::Value`). The packet layer never
//! looks inside either the body or the codec.
//!
//! # Example
//!
//! ```
//! use packwire::codec::{CodecRegistry, JSON_CODEC_ID};
//!
//! let registry = CodecRegistry::global();
//! let codec = registry.by_name("json").unwrap();
//! assert_eq!(codec.id(), JSON_CODEC_ID);
//!
//! let body = serde_json::json!({ "ok": true });
//! let bytes = codec.encode(&body).unwrap();
//! assert_eq!(bytes, br#"{"ok":true}"#);
//! ```

use std::any::Any;

use crate::error::Result;

mod json;
mod msgpack;
mod raw;
mod registry;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use raw::RawCodec;
pub use registry::{CodecRegistry, RegisteredCodec};

/// An opaque body value of application-defined shape.
pub type Body = Box<dyn Any + Send>;

/// Reserved id meaning "no codec chosen". Never registrable; encoding or
/// decoding with it fails before any byte is processed.
pub const NIL_CODEC_ID: u8 = 0;

/// Reserved name meaning "no codec chosen".
pub const NIL_CODEC_NAME: &str = "";

/// Wire id of the built-in JSON codec.
pub const JSON_CODEC_ID: u8 = b'j';

/// Wire id of the built-in MessagePack codec.
pub const MSGPACK_CODEC_ID: u8 = b'm';

/// Wire id of the built-in raw pass-through codec.
pub const RAW_CODEC_ID: u8 = b'r';

/// Encode/decode capability stored in the [`CodecRegistry`].
pub trait Codec: Send + Sync {
    /// Serializes `body` to bytes.
    ///
    /// Fails with [`UnsupportedBody`](crate::PackwireError::UnsupportedBody)
    /// when the concrete type behind `body` is not one this codec encodes.
    fn encode(&self, body: &(dyn Any + Send)) -> Result<Vec<u8>>;

    /// Deserializes `buf` into a new body value.
    fn decode(&self, buf: &[u8]) -> Result<Body>;
}
