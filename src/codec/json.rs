//! JSON codec using `serde_json`.
//!
//! Encodes bodies of type [`serde_json::Value`], `String` or `Vec<u8>` (the
//! last as a JSON array of numbers); decodes any JSON document into a
//! [`serde_json::Value`]. Registered at bootstrap as `"json"` with id
//! [`JSON_CODEC_ID`](crate::codec::JSON_CODEC_ID).

use std::any::Any;

use serde_json::Value;

use crate::codec::{Body, Codec};
use crate::error::{PackwireError, Result};

/// Built-in JSON codec.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, body: &(dyn Any + Send)) -> Result<Vec<u8>> {
        if let Some(value) = body.downcast_ref::<Value>() {
            return Ok(serde_json::to_vec(value)?);
        }
        if let Some(text) = body.downcast_ref::<String>() {
            return Ok(serde_json::to_vec(text)?);
        }
        if let Some(bytes) = body.downcast_ref::<Vec<u8>>() {
            return Ok(serde_json::to_vec(bytes)?);
        }
        Err(PackwireError::UnsupportedBody { codec: "json" })
    }

    fn decode(&self, buf: &[u8]) -> Result<Body> {
        let value: Value = serde_json::from_slice(buf)?;
        Ok(Box::new(value))
    }
}
