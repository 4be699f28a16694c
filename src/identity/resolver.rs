use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;
use tracing::{debug, error};

use super::principal::Principal;
use super::sources::extract_credential;
use crate::store::{StoreError, UserStore};
use crate::token::{TokenCodec, TokenError};

/// Why a request could not be authenticated. The first four map to 401;
/// `Store` is an infrastructure failure and maps to 500.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,
    #[error("invalid token")]
    InvalidToken,
    /// Token verified but its subject no longer exists (user deleted after
    /// issuance).
    #[error("token subject no longer exists")]
    UnknownUser,
    #[error("account is inactive")]
    Inactive,
    #[error("user lookup failed: {0}")]
    Store(String),
}

/// Turns an inbound request's credentials into an authenticated identity.
///
/// The user record is reloaded on every request rather than trusted from the
/// token payload, so role and active-flag edits take effect on the very next
/// request instead of waiting out the token lifetime.
pub struct SessionResolver {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserStore>,
}

impl SessionResolver {
    pub fn new(codec: Arc<TokenCodec>, users: Arc<dyn UserStore>) -> Self {
        Self { codec, users }
    }

    /// Extract → verify → reload the user → project.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = extract_credential(headers).ok_or(AuthError::MissingCredential)?;

        let claims = self.codec.verify(&token).map_err(|e| match e {
            TokenError::Expired | TokenError::InvalidSignature => {
                debug!(stage = "verify", "token rejected: {e}");
                AuthError::InvalidToken
            }
            TokenError::Signing(msg) => {
                error!(stage = "verify", "token verification failed: {msg}");
                AuthError::Store(msg)
            }
        })?;

        let record = self
            .users
            .find_by_id(&claims.sub)
            .await
            .map_err(|e| match e {
                StoreError::Unavailable(msg) => {
                    error!(stage = "resolve", "user lookup failed: {msg}");
                    AuthError::Store(msg)
                }
                other => {
                    error!(stage = "resolve", "user lookup failed: {other}");
                    AuthError::Store(other.to_string())
                }
            })?;

        let record = match record {
            Some(r) => r,
            None => {
                debug!(stage = "resolve", subject = %claims.sub, "token subject vanished");
                return Err(AuthError::UnknownUser);
            }
        };
        if !record.active {
            return Err(AuthError::Inactive);
        }
        Ok(Principal::from(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::identity::Role;
    use crate::store::{MemoryUserStore, UserRecord};
    use axum::http::HeaderValue;

    fn fixtures() -> (Arc<TokenCodec>, Arc<MemoryUserStore>, SessionResolver) {
        let codec = Arc::new(TokenCodec::new(&AppConfig {
            token_secret: "resolver-test-secret".into(),
            token_ttl_secs: 3600,
            http_port: 0,
        }));
        let store = Arc::new(MemoryUserStore::new());
        let resolver = SessionResolver::new(codec.clone(), store.clone());
        (codec, store, resolver)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        h
    }

    #[tokio::test]
    async fn resolves_current_record_not_token_claims() {
        let (codec, store, resolver) = fixtures();
        let saved = store
            .insert(UserRecord::new(
                "amy",
                "amy@clinic.test",
                "$argon2id$fake",
                Role::Vet,
            ))
            .await
            .unwrap();
        let token = codec.issue(&saved.id).unwrap();

        let principal = resolver.resolve(&bearer(&token)).await.unwrap();
        assert_eq!(principal.role, Role::Vet);

        // Role edit is visible on the next resolve with the same token.
        let mut edited = saved.clone();
        edited.role = Role::Admin;
        store.update(edited).await.unwrap();
        let principal = resolver.resolve(&bearer(&token)).await.unwrap();
        assert_eq!(principal.role, Role::Admin);
    }

    #[tokio::test]
    async fn missing_credential_is_not_an_internal_error() {
        let (_, _, resolver) = fixtures();
        let err = resolver.resolve(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential));
    }

    #[tokio::test]
    async fn deleted_user_yields_unknown_user() {
        let (codec, store, resolver) = fixtures();
        let saved = store
            .insert(UserRecord::new(
                "amy",
                "amy@clinic.test",
                "$argon2id$fake",
                Role::Vet,
            ))
            .await
            .unwrap();
        let token = codec.issue(&saved.id).unwrap();
        store.delete(&saved.id).await.unwrap();

        let err = resolver.resolve(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser));
    }

    #[tokio::test]
    async fn inactive_user_is_rejected() {
        let (codec, store, resolver) = fixtures();
        let mut saved = store
            .insert(UserRecord::new(
                "amy",
                "amy@clinic.test",
                "$argon2id$fake",
                Role::Vet,
            ))
            .await
            .unwrap();
        let token = codec.issue(&saved.id).unwrap();
        saved.active = false;
        store.update(saved).await.unwrap();

        let err = resolver.resolve(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::Inactive));
    }

    #[tokio::test]
    async fn expired_token_is_invalid_not_internal() {
        let (codec, store, resolver) = fixtures();
        let saved = store
            .insert(UserRecord::new(
                "amy",
                "amy@clinic.test",
                "$argon2id$fake",
                Role::Vet,
            ))
            .await
            .unwrap();
        let token = codec
            .issue_with_ttl(&saved.id, chrono::Duration::hours(-1))
            .unwrap();

        let err = resolver.resolve(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
