//! Error types for packwire.

use thiserror::Error;

/// The key a failed codec lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecSelector {
    /// Lookup by registered name.
    Name(String),
    /// Lookup by wire id.
    Id(u8),
}

impl std::fmt::Display for CodecSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecSelector::Name(name) if name.is_empty() => write!(f, "name \"\" (unset)"),
            CodecSelector::Name(name) => write!(f, "name {:?}", name),
            CodecSelector::Id(0) => write!(f, "id 0 (unset)"),
            CodecSelector::Id(id) => write!(f, "id {}", id),
        }
    }
}

/// Main error type for all packwire operations.
///
/// Structural decode errors carry the byte offset at which the problem was
/// detected. Decoding aborts at the first error; partial results are
/// discarded, never patched.
#[derive(Debug, Error)]
pub enum PackwireError {
    /// A varint kept its continuation bit past 64 bits of payload.
    #[error("varint overflows 64 bits at byte {offset}")]
    IntegerOverflow {
        /// Offset of the byte that would not fit.
        offset: usize,
    },

    /// The buffer ended in the middle of a field.
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEndOfInput {
        /// Offset at which more input was required.
        offset: usize,
    },

    /// A declared length cannot be represented as a non-negative size.
    #[error("invalid length prefix at byte {offset}")]
    NegativeLength {
        /// Offset of the length prefix.
        offset: usize,
    },

    /// A declared length runs past the end of the buffer.
    #[error("length-prefixed value needs {needed} bytes but {remaining} remain at byte {offset}")]
    TruncatedInput {
        /// Offset at which the value would start.
        offset: usize,
        /// Declared value length.
        needed: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },

    /// A tag decoded to a non-positive field number.
    #[error("illegal tag: field number {field} at byte {offset}")]
    MalformedTag {
        /// The offending field number.
        field: i32,
        /// Offset of the tag.
        offset: usize,
    },

    /// An end-group wire type appeared with no group open.
    #[error("end-group tag without a matching start at byte {offset}")]
    EndGroupWithoutStart {
        /// Offset of the tag.
        offset: usize,
    },

    /// A wire type outside the recognized set {0, 1, 2, 3, 5}.
    #[error("unsupported wire type {wire_type} at byte {offset}")]
    UnsupportedWireType {
        /// The raw wire type bits.
        wire_type: u8,
        /// Offset of the tag.
        offset: usize,
    },

    /// A known field was encoded with a wire type other than its own.
    #[error("wrong wire type {wire_type} for field {field} at byte {offset}")]
    WrongWireType {
        /// The field number in question.
        field: i32,
        /// The wire type actually seen.
        wire_type: u8,
        /// Offset of the value.
        offset: usize,
    },

    /// A codec lookup missed, or the unset codec was selected for use.
    #[error("codec not found: {0}")]
    CodecNotFound(CodecSelector),

    /// A registration collided with an existing name or id.
    #[error("codec {name:?} / id {id} already registered to a different codec")]
    DuplicateCodec {
        /// Name the registration was attempted under.
        name: String,
        /// Id the registration was attempted under.
        id: u8,
    },

    /// The empty name and id 0 are reserved to mean "unset".
    #[error("codec name {name:?} / id {id} is reserved")]
    ReservedCodec {
        /// Name the registration was attempted under.
        name: String,
        /// Id the registration was attempted under.
        id: u8,
    },

    /// The selected codec cannot encode a body of this concrete type.
    #[error("{codec} codec cannot encode a body of this type")]
    UnsupportedBody {
        /// Name of the rejecting codec.
        codec: &'static str,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

/// Result type alias using PackwireError.
pub type Result<T> = std::result::Result<T, PackwireError>;
