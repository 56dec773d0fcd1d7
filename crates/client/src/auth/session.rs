//! Session validity gate.
//!
//! Every authorized request passes through [`SessionGuard::ensure_valid`].
//! An expired or undecodable credential is cleared as a side effect, so the
//! next check reports `Unauthenticated` rather than repeating the failure.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use sdcart_core::Claims;

use super::decoder::{DecodeError, TokenDecoder};
use super::token_store::TokenStore;

/// Why a request could not be authorized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No credential is stored.
    #[error("not signed in")]
    Unauthenticated,

    /// The credential's expiry has passed.
    #[error("session expired, please sign in again")]
    Expired,

    /// The stored token could not be decoded.
    #[error("invalid session token: {0}")]
    Invalid(String),
}

/// Checks the stored credential before authorized work.
#[derive(Clone)]
pub struct SessionGuard {
    tokens: TokenStore,
    decoder: Arc<dyn TokenDecoder>,
}

impl SessionGuard {
    /// Create a guard over a token store and decoder.
    #[must_use]
    pub fn new(tokens: TokenStore, decoder: Arc<dyn TokenDecoder>) -> Self {
        Self { tokens, decoder }
    }

    /// The underlying token store.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Return the bearer token if the session is usable.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when no credential is stored
    /// - `Expired` when the expiry is in the past (credential is cleared)
    /// - `Invalid` when the token cannot be decoded (credential is cleared)
    pub fn ensure_valid(&self) -> Result<String, SessionError> {
        self.validate_at(Utc::now().timestamp())
            .map(|(token, _)| token)
    }

    /// Claims of the current valid session.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::ensure_valid`].
    pub fn claims(&self) -> Result<Claims, SessionError> {
        self.validate_at(Utc::now().timestamp())
            .map(|(_, claims)| claims)
    }

    /// Whether a usable session exists. Clears a dead credential.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.ensure_valid().is_ok()
    }

    /// Decode a token that has not been stored yet.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if the token is malformed.
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        self.decoder.decode(token)
    }

    fn validate_at(&self, now: i64) -> Result<(String, Claims), SessionError> {
        let credential = self.tokens.get().ok_or(SessionError::Unauthenticated)?;

        let claims = match self.decoder.decode(credential.token()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Stored token is undecodable; clearing session");
                self.tokens.clear();
                return Err(SessionError::Invalid(e.to_string()));
            }
        };

        // The expiry recorded at login wins over the token's own claim.
        let expires_at = credential.expires_at().or(claims.exp);
        if expires_at.is_some_and(|exp| exp < now) {
            tracing::info!(subject = %claims.sub, "Session expired; clearing credential");
            self.tokens.clear();
            return Err(SessionError::Expired);
        }

        Ok((credential.token().to_owned(), claims))
    }
}
