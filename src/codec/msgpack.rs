//! MsgPack codec using `rmp-serde`.
//!
//! Serialization goes through `to_vec_named` so maps keep their field names
//! on the wire and stay readable to peers that decode by key rather than by
//! position. Registered at bootstrap as `"msgpack"` with id
//! [`MSGPACK_CODEC_ID`](crate::codec::MSGPACK_CODEC_ID).
//!
//! Encodes bodies of type [`serde_json::Value`], `String` or `Vec<u8>` (the
//! last in the bin format); decodes into a [`serde_json::Value`]. A bin
//! payload has no `Value` representation, so binary-heavy traffic belongs to
//! the raw codec instead.

use std::any::Any;

use serde_json::Value;

use crate::codec::{Body, Codec};
use crate::error::{PackwireError, Result};

/// Built-in MessagePack codec.
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode(&self, body: &(dyn Any + Send)) -> Result<Vec<u8>> {
        if let Some(value) = body.downcast_ref::<Value>() {
            return Ok(rmp_serde::to_vec_named(value)?);
        }
        if let Some(text) = body.downcast_ref::<String>() {
            return Ok(rmp_serde::to_vec_named(text)?);
        }
        if let Some(bytes) = body.downcast_ref::<Vec<u8>>() {
            return Ok(rmp_serde::to_vec_named(&serde_bytes::Bytes::new(bytes))?);
        }
        Err(PackwireError::UnsupportedBody { codec: "msgpack" })
    }

    fn decode(&self, buf: &[u8]) -> Result<Body> {
        let value: Value = rmp_serde::from_slice(buf)?;
        Ok(Box::new(value))
    }
}
