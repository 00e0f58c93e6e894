//! Decoding of the claims carried by an access token.
//!
//! Only the payload segment is read. The signature is **not** verified: the token came straight
//! from the identity provider and is only inspected to learn who it was issued to.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The claims embedded in an access token.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

/// An error returned when a token's claims payload could not be decoded.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The token has no second, dot-separated segment.
    #[error("token has no claims segment")]
    MissingPayload,

    /// The claims segment is not valid base64url.
    #[error("claims segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The claims segment is not a JSON object.
    #[error("claims segment is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

impl Claims {
    /// Decode the claims from a compact-serialized token (`header.claims.signature`).
    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let payload = token.split('.').nth(1).ok_or(DecodeError::MissingPayload)?;

        // JWTs strip the padding; put it back so the canonical decoder accepts the payload.
        let mut padded = String::with_capacity(payload.len() + 3);
        padded.push_str(payload);
        padded.extend(std::iter::repeat('=').take(padding_len(payload)));

        let decoded = URL_SAFE.decode(padded)?;

        Ok(serde_json::from_slice(&decoded)?)
    }

    /// The value of the claim `name`, if it is present and a string.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// `true` if the token carried no claims at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Claims(map)
    }
}

fn padding_len(payload: &str) -> usize {
    (4 - payload.len() % 4) % 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token_with_payload(payload: &str) -> String {
        format!("eyJhbGciOiJSUzI1NiJ9.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_padding_len() {
        assert_eq!(padding_len(""), 0);
        assert_eq!(padding_len("abcd"), 0);
        assert_eq!(padding_len("abcdef"), 2);
        assert_eq!(padding_len("abcdefg"), 1);
        assert_eq!(padding_len("abcde"), 3);
    }

    #[test]
    fn it_decodes_payloads_of_every_valid_length() {
        for (claims, remainder) in [
            (json!({"a":"b"}), 0),
            (json!({"a":"bc"}), 2),
            (json!({"a":"bcd"}), 3),
        ] {
            let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
            assert_eq!(payload.len() % 4, remainder, "{payload}");

            let decoded = Claims::decode(&token_with_payload(&payload)).unwrap();
            assert_eq!(decoded.get("a"), claims["a"].as_str());
        }
    }

    #[test]
    fn it_rejects_payloads_with_an_impossible_length() {
        let err = Claims::decode(&token_with_payload("eyJhI")).unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)), "{err:?}");
    }

    #[test]
    fn it_accepts_url_safe_characters() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"upn":">?>?"}"#);
        assert!(payload.contains(['-', '_']), "{payload}");

        let claims = Claims::decode(&token_with_payload(&payload)).unwrap();
        assert_eq!(claims.get("upn"), Some(">?>?"));
    }

    #[test]
    fn it_rejects_malformed_tokens() {
        assert!(matches!(
            Claims::decode("not-a-jwt"),
            Err(DecodeError::MissingPayload)
        ));
        assert!(matches!(Claims::decode(""), Err(DecodeError::MissingPayload)));
        assert!(matches!(
            Claims::decode("header..signature"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            Claims::decode("header.!!!!.signature"),
            Err(DecodeError::Base64(_))
        ));

        let not_an_object = URL_SAFE_NO_PAD.encode("[1, 2, 3]");
        assert!(matches!(
            Claims::decode(&token_with_payload(&not_an_object)),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn it_only_returns_string_claims() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"upn":"user@example.com","exp":1714564800}"#);
        let claims = Claims::decode(&token_with_payload(&payload)).unwrap();

        assert_eq!(claims.get("upn"), Some("user@example.com"));
        assert_eq!(claims.get("exp"), None);
        assert_eq!(claims.get("missing"), None);
        assert!(!claims.is_empty());
    }
}
