//! Serialization codec for persisted fragments
//!
//! A [`Codec`] converts fragment values to and from their stored text
//! representation. The only law the synchronizer relies on is the round
//! trip: `deserialize(serialize(v)) == v` for every value it stores. It
//! never assumes determinism of key order in the representation.

use crate::error::CodecError;
use serde_json::Value;

/// Pluggable serialize/deserialize pair
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Encode a fragment value into its stored representation
    ///
    /// # Errors
    /// Returns [`CodecError::Serialize`] if the value cannot be encoded.
    fn serialize(&self, value: &Value) -> Result<String, CodecError>;

    /// Decode a stored representation back into a fragment value
    ///
    /// # Errors
    /// Returns [`CodecError::Deserialize`] for malformed input and
    /// [`CodecError::InvalidRepresentation`] for known-invalid markers.
    fn deserialize(&self, repr: &str) -> Result<Value, CodecError>;
}

/// Default JSON codec
///
/// Legacy stores may contain the literal token `undefined` for fragments
/// that were absent at write time; it is rejected as an invalid
/// representation so the fragment degrades to its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create the default codec
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn serialize(&self, value: &Value) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(CodecError::Serialize)
    }

    fn deserialize(&self, repr: &str) -> Result<Value, CodecError> {
        if repr == "undefined" {
            return Err(CodecError::InvalidRepresentation(repr.to_string()));
        }
        serde_json::from_str(repr).map_err(CodecError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn round_trip_object() {
        let codec = JsonCodec::new();
        let value = json!({"count": 100, "nested": {"flag": true}});
        let repr = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&repr).unwrap(), value);
    }

    #[test]
    fn malformed_input_is_an_error() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.deserialize("{not json"),
            Err(CodecError::Deserialize(_))
        ));
    }

    #[test]
    fn undefined_token_is_invalid() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.deserialize("undefined"),
            Err(CodecError::InvalidRepresentation(_))
        ));
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                    let mut map = serde_json::Map::new();
                    for (key, value) in entries {
                        map.insert(key, value);
                    }
                    Value::Object(map)
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn round_trip_law(value in json_value()) {
            let codec = JsonCodec::new();
            let repr = codec.serialize(&value).unwrap();
            prop_assert_eq!(codec.deserialize(&repr).unwrap(), value);
        }
    }
}
