//! Bearer token claim decoding.
//!
//! The backend issues compact JWTs. The client cannot verify signatures (it
//! holds no key) and only needs the payload claims for expiry checks and
//! "who am I" displays, so decoding is a pure base64url + JSON step.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

use sdcart_core::Claims;

/// Errors that can occur while decoding a token.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Token is not `header.payload.signature`.
    #[error("token is not a three-part JWT")]
    Malformed,

    /// Payload segment is not base64url.
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload is not a JSON claims object.
    #[error("token payload is not a claims object: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Extracts claims from a bearer token.
pub trait TokenDecoder: Send + Sync {
    /// Decode the token's claims.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if the token is malformed.
    fn decode(&self, token: &str) -> Result<Claims, DecodeError>;
}

/// Unverified JWT payload decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtDecoder;

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        let mut segments = token.trim().split('.');
        let (Some(header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(DecodeError::Malformed);
        };

        if header.is_empty() || payload.is_empty() {
            return Err(DecodeError::Malformed);
        }

        // Some issuers pad the segments even though JWT forbids it.
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decodes_claims() {
        let token = encode(&serde_json::json!({
            "sub": "asha@example.com",
            "role": "USER",
            "exp": 1_900_000_000
        }));

        let claims = JwtDecoder.decode(&token).unwrap();
        assert_eq!(claims.sub, "asha@example.com");
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn test_padded_payload_accepted() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"ab"}"#);
        let claims = JwtDecoder.decode(&format!("{header}.{body}.sig")).unwrap();
        assert_eq!(claims.sub, "ab");
    }

    #[test]
    fn test_wrong_segment_count() {
        assert!(matches!(JwtDecoder.decode("abc"), Err(DecodeError::Malformed)));
        assert!(matches!(JwtDecoder.decode("a.b"), Err(DecodeError::Malformed)));
        assert!(matches!(JwtDecoder.decode("a.b.c.d"), Err(DecodeError::Malformed)));
        assert!(matches!(JwtDecoder.decode(".b.c"), Err(DecodeError::Malformed)));
    }

    #[test]
    fn test_bad_base64() {
        assert!(matches!(
            JwtDecoder.decode("aGVhZA.!!!.sig"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_payload_without_subject() {
        let token = encode(&serde_json::json!({ "exp": 1 }));
        assert!(matches!(JwtDecoder.decode(&token), Err(DecodeError::Claims(_))));
    }
}
