use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::CacheError;

/// Wire encoding of a record payload.
///
/// The cache engine treats encoded payloads as opaque bytes; the codec is a
/// property of the record type and is never written into the composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Self-describing JSON (serde_json).
    #[default]
    Json,
    /// Compact binary (bitcode).
    Bitcode,
}

impl Codec {
    pub fn encode<T: Serialize + ?Sized>(
        self,
        type_tag: &str,
        value: &T,
    ) -> Result<Vec<u8>, CacheError> {
        let encoded = match self {
            Codec::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            Codec::Bitcode => bitcode::serialize(value).map_err(|e| e.to_string()),
        };
        encoded.map_err(|message| CacheError::Encode {
            type_tag: type_tag.to_string(),
            message,
        })
    }

    pub fn decode<T: DeserializeOwned>(self, type_tag: &str, bytes: &[u8]) -> Result<T, CacheError> {
        let decoded = match self {
            Codec::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Codec::Bitcode => bitcode::deserialize(bytes).map_err(|e| e.to_string()),
        };
        decoded.map_err(|message| CacheError::Decode {
            type_tag: type_tag.to_string(),
            message,
        })
    }
}
