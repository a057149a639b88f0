//! Value codecs for the cache transport.
//!
//! A codec turns a [`CachedValue`] into the bytes a cache backend stores and
//! back. Two strategies are provided:
//!
//! - [`BinaryCodec`]: compact `bincode` payload behind a one-byte type tag.
//!   Every value kind must be registered in a [`TypeRegistry`] first.
//! - [`JsonCodec`]: self-describing JSON with an `"@type"` discriminator,
//!   larger and slower but readable with any Redis/LMDB inspection tool.
//!
//! Both treat "no value" as a zero-length payload and decode a zero-length
//! payload as absence rather than an error.
//!
//! The set of encodable types is closed: [`CachedValue`] is the only thing a
//! codec accepts, so an unexpected concrete type cannot sneak in through a
//! polymorphic decode.

pub mod binary;
pub mod json;

pub use binary::{BinaryCodec, TypeRegistry};
pub use json::JsonCodec;

use std::fmt;
use std::sync::Arc;

use larder_core::{CodecError, CodecKind, FetchResult, Item};
use serde::{Deserialize, Serialize};

/// Encoder/decoder between cached values and transport bytes.
///
/// Implementations must be stateless per call so one instance can be shared
/// by every task through an `Arc<dyn Codec>`.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short name used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Encode a value. `None` encodes to an empty payload.
    fn encode(&self, value: Option<&CachedValue>) -> Result<Vec<u8>, CodecError>;

    /// Decode a payload. An empty payload decodes to `None`.
    fn decode(&self, bytes: &[u8]) -> Result<Option<CachedValue>, CodecError>;
}

/// Discriminator for the closed set of cacheable types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Item,
    FetchResult,
}

impl ValueKind {
    /// Every kind, in registration order.
    pub const ALL: [ValueKind; 2] = [ValueKind::Item, ValueKind::FetchResult];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "Item",
            Self::FetchResult => "FetchResult",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that may be written to a cache region.
///
/// In JSON the variant name is written as an `"@type"` field next to the
/// value's own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum CachedValue {
    Item(Item),
    FetchResult(FetchResult),
}

impl CachedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Item(_) => ValueKind::Item,
            Self::FetchResult(_) => ValueKind::FetchResult,
        }
    }
}

impl From<Item> for CachedValue {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

impl From<FetchResult> for CachedValue {
    fn from(result: FetchResult) -> Self {
        Self::FetchResult(result)
    }
}

impl TryFrom<CachedValue> for Item {
    type Error = CodecError;

    fn try_from(value: CachedValue) -> Result<Self, Self::Error> {
        match value {
            CachedValue::Item(item) => Ok(item),
            other => Err(CodecError::UnexpectedKind {
                expected: ValueKind::Item.to_string(),
                found: other.kind().to_string(),
            }),
        }
    }
}

impl TryFrom<CachedValue> for FetchResult {
    type Error = CodecError;

    fn try_from(value: CachedValue) -> Result<Self, Self::Error> {
        match value {
            CachedValue::FetchResult(result) => Ok(result),
            other => Err(CodecError::UnexpectedKind {
                expected: ValueKind::FetchResult.to_string(),
                found: other.kind().to_string(),
            }),
        }
    }
}

/// Build the shared codec instance for a configured strategy.
pub fn codec_for(kind: CodecKind) -> Arc<dyn Codec> {
    match kind {
        CodecKind::Binary => Arc::new(BinaryCodec::new(TypeRegistry::standard())),
        CodecKind::Json => Arc::new(JsonCodec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::ItemId;

    #[test]
    fn test_kind_names() {
        let item = CachedValue::from(Item::with_id(ItemId::new(1), "A", "a"));
        assert_eq!(item.kind(), ValueKind::Item);
        assert_eq!(item.kind().to_string(), "Item");

        let result = CachedValue::from(FetchResult::not_found(0, 0));
        assert_eq!(result.kind(), ValueKind::FetchResult);
    }

    #[test]
    fn test_try_from_wrong_kind() {
        let value = CachedValue::from(FetchResult::not_found(0, 0));
        let err = Item::try_from(value).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedKind {
                expected: "Item".to_string(),
                found: "FetchResult".to_string(),
            }
        );
    }

    #[test]
    fn test_codec_for_selects_strategy() {
        assert_eq!(codec_for(CodecKind::Binary).name(), "bincode");
        assert_eq!(codec_for(CodecKind::Json).name(), "json");
    }
}
