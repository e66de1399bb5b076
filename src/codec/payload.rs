//! Payload token codec.
//!
//! The `data` mapping of a routing key is serialized with MessagePack and
//! then base64url encoded without padding. The resulting token contains only
//! `[A-Za-z0-9_-]`, so it never collides with the key separator.
//!
//! Always `to_vec_named`: structs must serialize as maps so tokens built by
//! one release still decode after fields are reordered.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::Result;

/// MessagePack + base64url codec for routing-key payloads.
pub struct PayloadCodec;

impl PayloadCodec {
    /// Encode a value to MsgPack bytes.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Encode a value into a separator-free text token.
    pub fn encode_token<T: serde::Serialize>(value: &T) -> Result<String> {
        let bytes = Self::encode(value)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decode a text token produced by [`PayloadCodec::encode_token`].
    pub fn decode_token<T: serde::de::DeserializeOwned>(token: &str) -> Result<T> {
        let bytes = URL_SAFE_NO_PAD.decode(token)?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Selection {
        step: String,
        picks: Vec<String>,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = Selection {
            step: "skills".to_string(),
            picks: vec!["stealth".to_string(), "arcana".to_string()],
        };

        let token = PayloadCodec::encode_token(&original).unwrap();
        let decoded: Selection = PayloadCodec::decode_token(&token).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_token_is_separator_free() {
        let mut map = BTreeMap::new();
        map.insert("page".to_string(), serde_json::json!(3));
        map.insert("filter".to_string(), serde_json::json!("a:b/c+d"));

        let token = PayloadCodec::encode_token(&map).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded: BTreeMap<String, serde_json::Value> =
            PayloadCodec::decode_token(&token).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_to_vec_named_produces_map_format() {
        let sel = Selection {
            step: "race".to_string(),
            picks: vec![],
        };
        let encoded = PayloadCodec::encode(&sel).unwrap();
        // fixmap with 2 entries, not fixarray
        assert_eq!(encoded[0], 0x82, "Expected fixmap, got {:02X}", encoded[0]);
    }

    #[test]
    fn test_decode_error_on_invalid_token() {
        let result: Result<Selection> = PayloadCodec::decode_token("!!not base64!!");
        assert!(result.is_err());

        // Valid base64, invalid msgpack for the target type
        let token = URL_SAFE_NO_PAD.encode(b"\xc1");
        let result: Result<Selection> = PayloadCodec::decode_token(&token);
        assert!(result.is_err());
    }
}
