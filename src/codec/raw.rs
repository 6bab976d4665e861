//! Raw codec - pass-through for binary data.
//!
//! Used when a body is already serialized or is plain bytes. Registered at
//! bootstrap as `"raw"` with id [`RAW_CODEC_ID`](crate::codec::RAW_CODEC_ID).
//!
//! Encodes bodies of type [`bytes::Bytes`], `Vec<u8>` or `String` verbatim;
//! decodes any region into a [`bytes::Bytes`] body.

use std::any::Any;

use bytes::Bytes;

use crate::codec::{Body, Codec};
use crate::error::{PackwireError, Result};

/// Built-in pass-through codec.
pub struct RawCodec;

impl Codec for RawCodec {
    fn encode(&self, body: &(dyn Any + Send)) -> Result<Vec<u8>> {
        if let Some(bytes) = body.downcast_ref::<Bytes>() {
            return Ok(bytes.to_vec());
        }
        if let Some(bytes) = body.downcast_ref::<Vec<u8>>() {
            return Ok(bytes.clone());
        }
        if let Some(text) = body.downcast_ref::<String>() {
            return Ok(text.clone().into_bytes());
        }
        Err(PackwireError::UnsupportedBody { codec: "raw" })
    }

    fn decode(&self, buf: &[u8]) -> Result<Body> {
        Ok(Box::new(Bytes::copy_from_slice(buf)))
    }
}
