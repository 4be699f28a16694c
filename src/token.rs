//! Signed session tokens.
//!
//! Thin codec over HMAC-SHA256 JWTs: `issue` signs a subject with an
//! embedded expiry, `verify` rejects expired or tampered tokens with
//! distinct errors. Only the subject claim is trusted downstream; the
//! session resolver reloads the user record for everything else.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: id of the user the token was issued to.
    pub sub: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    /// Covers both signature mismatch and malformed input; callers treat
    /// every verification failure identically.
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Issues and verifies session tokens with the process-wide secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Zero leeway keeps the expired/invalid boundary exact.
        validation.leeway = 0;
        validation.validate_exp = true;
        Self {
            encoding: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.token_secret.as_bytes()),
            validation,
            default_ttl: Duration::seconds(config.token_ttl_secs),
        }
    }

    /// Sign a token for `user_id` with the default lifetime.
    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, self.default_ttl)
    }

    /// Sign a token with an explicit lifetime.
    pub fn issue_with_ttl(&self, user_id: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&AppConfig {
            token_secret: secret.to_string(),
            token_ttl_secs: 3600,
            http_port: 0,
        })
    }

    #[test]
    fn issue_verify_round_trip() {
        let codec = test_codec("test-secret-key-for-testing");
        let token = codec.issue("user-42").unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_reports_expired_not_invalid() {
        let codec = test_codec("test-secret-key-for-testing");
        let token = codec
            .issue_with_ttl("user-42", Duration::hours(-1))
            .unwrap();
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn tampering_any_character_invalidates_signature() {
        let codec = test_codec("test-secret-key-for-testing");
        let token = codec.issue("user-42").unwrap();
        // Flip one character in the payload segment.
        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            codec.verify(&tampered),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let codec = test_codec("correct-secret");
        let other = test_codec("wrong-secret");
        let token = other.issue("user-42").unwrap();
        assert!(matches!(
            codec.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let codec = test_codec("test-secret-key-for-testing");
        assert!(matches!(
            codec.verify("not-a-token"),
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(
            codec.verify(""),
            Err(TokenError::InvalidSignature)
        ));
    }
}
