//! Codec registry - name and wire-id keyed codec lookup.
//!
//! One process-wide table maps both a string name (used in configuration)
//! and a byte id (used on the wire) to a [`Codec`] capability. Registration
//! happens during startup; after that the registry is read-mostly and
//! lookups only take the read side of the lock.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::codec::{
    Body, Codec, JsonCodec, MsgPackCodec, RawCodec, JSON_CODEC_ID, MSGPACK_CODEC_ID,
    NIL_CODEC_ID, NIL_CODEC_NAME, RAW_CODEC_ID,
};
use crate::error::{CodecSelector, PackwireError, Result};

/// A codec together with the name and wire id it was registered under.
///
/// Lookups hand these out by value (the clone is two `Arc` bumps), so a
/// caller can keep encoding and decoding without touching the registry
/// lock again.
#[derive(Clone)]
pub struct RegisteredCodec {
    name: Arc<str>,
    id: u8,
    codec: Arc<dyn Codec>,
}

impl RegisteredCodec {
    /// Registered name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered wire id.
    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Serializes `body` with this codec.
    pub fn encode(&self, body: &(dyn Any + Send)) -> Result<Vec<u8>> {
        self.codec.encode(body)
    }

    /// Deserializes `buf` with this codec.
    pub fn decode(&self, buf: &[u8]) -> Result<Body> {
        self.codec.decode(buf)
    }

    fn is_same(&self, name: &str, id: u8, codec: &Arc<dyn Codec>) -> bool {
        &*self.name == name && self.id == id && Arc::ptr_eq(&self.codec, codec)
    }
}

impl fmt::Debug for RegisteredCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCodec")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

#[derive(Default)]
struct Tables {
    by_name: HashMap<String, RegisteredCodec>,
    by_id: HashMap<u8, RegisteredCodec>,
}

impl Tables {
    fn insert(&mut self, name: &str, id: u8, codec: Arc<dyn Codec>) {
        let entry = RegisteredCodec {
            name: Arc::from(name),
            id,
            codec,
        };
        self.by_name.insert(name.to_string(), entry.clone());
        self.by_id.insert(id, entry);
    }
}

/// Mapping from codec names and wire ids to capabilities.
///
/// A single lock guards both tables, so a reader can never observe a codec
/// present under its name but missing under its id.
pub struct CodecRegistry {
    tables: RwLock<Tables>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    pub fn new() -> CodecRegistry {
        CodecRegistry {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// The process-wide registry, bootstrapped with the built-in codecs
    /// `"json"`, `"msgpack"` and `"raw"`.
    pub fn global() -> &'static CodecRegistry {
        static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CodecRegistry::with_builtins)
    }

    fn with_builtins() -> CodecRegistry {
        let registry = CodecRegistry::new();
        {
            let mut tables = registry.tables.write();
            tables.insert("json", JSON_CODEC_ID, Arc::new(JsonCodec));
            tables.insert("msgpack", MSGPACK_CODEC_ID, Arc::new(MsgPackCodec));
            tables.insert("raw", RAW_CODEC_ID, Arc::new(RawCodec));
        }
        registry
    }

    /// Registers `codec` under `name` and `id`.
    ///
    /// Re-registering an identical (name, id, capability) triple is a
    /// no-op. Any other collision on either key fails with
    /// [`DuplicateCodec`](PackwireError::DuplicateCodec); the reserved
    /// unset name and id fail with
    /// [`ReservedCodec`](PackwireError::ReservedCodec).
    pub fn register(&self, name: &str, id: u8, codec: Arc<dyn Codec>) -> Result<()> {
        if name == NIL_CODEC_NAME || id == NIL_CODEC_ID {
            return Err(PackwireError::ReservedCodec {
                name: name.to_string(),
                id,
            });
        }
        let mut tables = self.tables.write();
        match (tables.by_name.get(name), tables.by_id.get(&id)) {
            (None, None) => {}
            (Some(existing), Some(_)) if existing.is_same(name, id, &codec) => return Ok(()),
            _ => {
                return Err(PackwireError::DuplicateCodec {
                    name: name.to_string(),
                    id,
                });
            }
        }
        tables.insert(name, id, codec);
        tracing::debug!("registered codec {:?} with id {}", name, id);
        Ok(())
    }

    /// Looks up a codec by registered name.
    ///
    /// The reserved empty name means "unset" and is never found.
    pub fn by_name(&self, name: &str) -> Result<RegisteredCodec> {
        self.tables
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| PackwireError::CodecNotFound(CodecSelector::Name(name.to_string())))
    }

    /// Looks up a codec by wire id.
    ///
    /// The reserved id 0 means "unset" and is never found.
    pub fn by_id(&self, id: u8) -> Result<RegisteredCodec> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(PackwireError::CodecNotFound(CodecSelector::Id(id)))
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.tables.read().by_name.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.tables.read().by_name.is_empty()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
