//! Serialization codecs.
//!
//! A codec is a stateless encode/decode pair between typed values and the
//! raw bytes handed to a backend.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Byte encoding used by a [`Store`](super::Store).
pub trait Codec: Send {
    fn encode<V: Serialize>(&self, value: &V) -> Result<Vec<u8>>;

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V>;
}

/// Compact binary encoding.
///
/// Not self-describing: it cannot decode `serde_json::Value` or other types
/// that rely on `deserialize_any`. Use [`JsonCodec`] for those.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<V: Serialize>(&self, value: &V) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// JSON encoding; readable on disk and able to carry dynamic values.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<V: Serialize>(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        label: String,
    }

    #[test]
    fn test_bincode_struct() {
        let codec = BincodeCodec;
        let point = Point {
            x: -4,
            label: "origin".to_string(),
        };
        let bytes = codec.encode(&point).unwrap();
        assert_eq!(codec.decode::<Point>(&bytes).unwrap(), point);
    }

    #[test]
    fn test_json_dynamic_value() {
        let codec = JsonCodec;
        let value = json!({"nested": [1, 2, {"deep": true}]});
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode::<serde_json::Value>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        let result = JsonCodec.decode::<Point>(b"not json");
        assert!(matches!(result, Err(StoreError::Serialization(_))));

        let result = BincodeCodec.decode::<String>(&[0xff]);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
