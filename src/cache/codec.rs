//! Value ⇄ blob conversion for cached results.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use super::client::CacheError;

/// Serializer pair used by [`CacheAside`](super::CacheAside).
///
/// Implementations must round-trip every value they encode without loss.
pub trait BlobCodec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CacheError>;
    fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> Result<T, CacheError>;
}

/// UTF-8 JSON blobs. Non-ASCII text is stored unescaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BlobCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CacheError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> Result<T, CacheError> {
        Ok(serde_json::from_slice(blob)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn falsy_values_encode_to_non_empty_blobs() {
        let codec = JsonCodec;
        assert_eq!(codec.encode(&"").expect("encode"), Bytes::from_static(b"\"\""));
        assert_eq!(codec.encode(&0).expect("encode"), Bytes::from_static(b"0"));
        assert_eq!(
            codec.encode(&BTreeMap::<String, i32>::new()).expect("encode"),
            Bytes::from_static(b"{}")
        );
    }

    #[test]
    fn non_ascii_text_survives() {
        let codec = JsonCodec;
        let blob = codec.encode(&"Usuario 7 (áéíóúñ)").expect("encode");
        assert!(std::str::from_utf8(&blob).expect("utf-8").contains('ñ'));
        let decoded: String = codec.decode(&blob).expect("decode");
        assert_eq!(decoded, "Usuario 7 (áéíóúñ)");
    }

    #[test]
    fn corrupted_blob_is_a_codec_error() {
        let codec = JsonCodec;
        let err = codec.decode::<String>(b"\x80not json").expect_err("must fail");
        assert!(matches!(err, CacheError::Codec(_)));
    }
}
