//! Self-describing JSON codec.
//!
//! Payloads carry an `"@type"` field naming the concrete value kind, so they
//! decode without any registration on the reading side and stay readable when
//! inspected directly in the backend. Decoding is restricted to an allow-list
//! of kinds; anything else is rejected instead of being materialized.

use larder_core::CodecError;

use super::{CachedValue, Codec, ValueKind};

const CODEC_NAME: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonCodec {
    allowed: Vec<ValueKind>,
}

impl JsonCodec {
    /// Codec accepting every cacheable kind.
    pub fn new() -> Self {
        Self {
            allowed: ValueKind::ALL.to_vec(),
        }
    }

    /// Codec accepting only `kinds`.
    pub fn allowing(kinds: &[ValueKind]) -> Self {
        Self {
            allowed: kinds.to_vec(),
        }
    }

    pub fn allows(&self, kind: ValueKind) -> bool {
        self.allowed.contains(&kind)
    }

    fn check_allowed(&self, kind: ValueKind) -> Result<(), CodecError> {
        if self.allows(kind) {
            Ok(())
        } else {
            Err(CodecError::Rejected {
                codec: CODEC_NAME.to_string(),
                kind: kind.to_string(),
            })
        }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn encode(&self, value: Option<&CachedValue>) -> Result<Vec<u8>, CodecError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        self.check_allowed(value.kind())?;

        serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            codec: CODEC_NAME.to_string(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Option<CachedValue>, CodecError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let value: CachedValue = serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            codec: CODEC_NAME.to_string(),
            reason: e.to_string(),
        })?;
        self.check_allowed(value.kind())?;

        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::{FetchResult, Item, ItemId};

    #[test]
    fn test_payload_names_its_type() {
        let codec = JsonCodec::new();
        let value = CachedValue::Item(Item::with_id(ItemId::new(1), "A", "a"));
        let bytes = codec.encode(Some(&value)).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["@type"], "Item");
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "A");
    }

    #[test]
    fn test_roundtrip_both_kinds() {
        let codec = JsonCodec::new();
        let item = CachedValue::Item(Item::with_id(ItemId::new(5), "E", "e"));
        let result = CachedValue::FetchResult(FetchResult::from_store(
            Item::with_id(ItemId::new(5), "E", "e"),
            1,
            0,
        ));

        for value in [item, result] {
            let bytes = codec.encode(Some(&value)).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), Some(value));
        }
    }

    #[test]
    fn test_empty_is_absence() {
        let codec = JsonCodec::new();
        assert!(codec.encode(None).unwrap().is_empty());
        assert_eq!(codec.decode(b"").unwrap(), None);
    }

    #[test]
    fn test_unknown_type_is_decode_error() {
        let codec = JsonCodec::new();
        let err = codec
            .decode(br#"{"@type":"java.lang.ProcessBuilder","command":["sh"]}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn test_missing_type_is_decode_error() {
        let codec = JsonCodec::new();
        let err = codec
            .decode(br#"{"id":1,"name":"A","description":"a"}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn test_allow_list_rejects_other_kinds() {
        let codec = JsonCodec::allowing(&[ValueKind::Item]);
        let result = CachedValue::FetchResult(FetchResult::not_found(0, 0));

        let err = codec.encode(Some(&result)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected { ref kind, .. } if kind == "FetchResult"));

        let bytes = JsonCodec::new().encode(Some(&result)).unwrap();
        assert!(matches!(
            codec.decode(&bytes),
            Err(CodecError::Rejected { .. })
        ));
    }
}
