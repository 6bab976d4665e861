//! # packwire
//!
//! Binary packet framing with a tagged-field header codec, pluggable body
//! codecs, and pooled packet reuse.
//!
//! ## Architecture
//!
//! - **Wire format** (`protocol`): varint and tagged-field primitives, the
//!   fixed six-field header record, and the [`Packet`] container with
//!   length bookkeeping for an outer transport
//! - **Codecs** (`codec`): a registry mapping codec names and wire ids to
//!   encode/decode capabilities, bootstrapped with `json`, `msgpack` and
//!   `raw`
//! - **Pooling** ([`acquire`]/[`release`]): a LIFO free list so
//!   steady-state traffic reuses packet allocations
//!
//! ## Example
//!
//! ```
//! use packwire::{acquire, release, PacketSetting};
//! use serde_json::json;
//!
//! let mut packet = acquire(
//!     None,
//!     [
//!         PacketSetting::BodyCodec("json".into()),
//!         PacketSetting::BodyGzip(0),
//!     ],
//! )?;
//! packet.header_mut().seq = 7;
//! packet.header_mut().uri = "/ping".to_string();
//! packet.set_body(Box::new(json!({"ok": true})));
//!
//! let header = packet.encode_header();
//! let body = packet.encode_body()?;
//! assert_eq!(packet.length(), (header.len() + body.len()) as u64);
//!
//! release(packet);
//! # Ok::<(), packwire::PackwireError>(())
//! ```

pub mod codec;
pub mod error;
pub mod protocol;

pub use codec::{Body, Codec, CodecRegistry, RegisteredCodec};
pub use error::{CodecSelector, PackwireError};
pub use protocol::{acquire, release, BodyResolver, Header, Packet, PacketPool, PacketSetting};
