//! JSON value codec.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Codec error.
#[derive(Debug, Error)]
#[error("Codec error: {0}")]
pub struct CodecError(#[from] serde_json::Error);

/// Serialize a value for the bus.
///
/// # Errors
/// Returns error if the value cannot be represented as JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, CodecError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Deserialize a value read from the bus.
///
/// # Errors
/// Returns error if `raw` is not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(raw)?)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_encode_decode() {
        let value = json!({"text": "hi", "n": [1, 2]});
        let raw = encode(&value).unwrap();
        let back: Value = decode(&raw).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_decode_malformed() {
        let result = decode::<Value>(b"{not json");
        assert!(result.is_err());
    }
}
