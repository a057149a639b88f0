//! Compact binary codec.
//!
//! Wire format: `[tag: 1 byte][bincode payload]`, where the tag is the
//! position of the value kind in the codec's [`TypeRegistry`]. Both sides of
//! the transport must register the same kinds in the same order.

use bincode::Options;
use larder_core::{CodecError, FetchResult, Item};

use super::{CachedValue, Codec, ValueKind};

const CODEC_NAME: &str = "bincode";

/// Ordered registration of the value kinds a [`BinaryCodec`] may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    kinds: Vec<ValueKind>,
}

impl TypeRegistry {
    /// Empty registry. Nothing can be encoded until kinds are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every cacheable kind (`Item`, then `FetchResult`).
    pub fn standard() -> Self {
        ValueKind::ALL
            .iter()
            .fold(Self::new(), |registry, kind| registry.register(*kind))
    }

    /// Register a kind. Registering twice keeps the first tag.
    pub fn register(mut self, kind: ValueKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn tag_of(&self, kind: ValueKind) -> Option<u8> {
        self.kinds
            .iter()
            .position(|k| *k == kind)
            .and_then(|pos| u8::try_from(pos).ok())
    }

    fn kind_of(&self, tag: u8) -> Option<ValueKind> {
        self.kinds.get(tag as usize).copied()
    }
}

/// Fast, opaque codec backed by `bincode`.
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    registry: TypeRegistry,
}

impl BinaryCodec {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Fixed-width integers, and a payload must be consumed exactly.
    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
    }

    fn encode_err(e: bincode::Error) -> CodecError {
        CodecError::Encode {
            codec: CODEC_NAME.to_string(),
            reason: e.to_string(),
        }
    }

    fn decode_err(e: bincode::Error) -> CodecError {
        CodecError::Decode {
            codec: CODEC_NAME.to_string(),
            reason: e.to_string(),
        }
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new(TypeRegistry::standard())
    }
}

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn encode(&self, value: Option<&CachedValue>) -> Result<Vec<u8>, CodecError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };

        let tag = self
            .registry
            .tag_of(value.kind())
            .ok_or_else(|| CodecError::Unregistered {
                codec: CODEC_NAME.to_string(),
                kind: value.kind().to_string(),
            })?;

        let payload = match value {
            CachedValue::Item(item) => Self::options().serialize(item),
            CachedValue::FetchResult(result) => Self::options().serialize(result),
        }
        .map_err(Self::encode_err)?;

        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(tag);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Option<CachedValue>, CodecError> {
        let Some((&tag, payload)) = bytes.split_first() else {
            return Ok(None);
        };

        let kind = self
            .registry
            .kind_of(tag)
            .ok_or_else(|| CodecError::Unregistered {
                codec: CODEC_NAME.to_string(),
                kind: format!("tag {}", tag),
            })?;

        let value = match kind {
            ValueKind::Item => Self::options()
                .deserialize::<Item>(payload)
                .map(CachedValue::Item)
                .map_err(Self::decode_err)?,
            ValueKind::FetchResult => Self::options()
                .deserialize::<FetchResult>(payload)
                .map(CachedValue::FetchResult)
                .map_err(Self::decode_err)?,
        };

        Ok(Some(value))
    }
}
