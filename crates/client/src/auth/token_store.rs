//! Persistent bearer credential.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the credential.
pub const TOKEN_KEY: &str = "userToken";

/// Values older clients wrote instead of removing the key.
const NULLISH_TOKENS: [&str; 2] = ["null", "undefined"];

/// Bearer token plus optional expiry.
///
/// Replace-only: a new login produces a new `Credential`; nothing mutates
/// an existing one. Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Credential {
    token: SecretString,
    expires_at: Option<i64>,
}

impl Credential {
    /// Create a credential from a raw token and optional expiry (epoch seconds).
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_at,
        }
    }

    /// The raw bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Expiry as epoch seconds, if known.
    #[must_use]
    pub const fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// On-disk shape of a credential.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredential {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

/// Holds, retrieves and clears the session credential.
///
/// No network calls; all state lives in the injected [`KeyValueStore`].
/// Every save or clear advances a generation counter published on a
/// `watch` channel, so state owned by the previous session can be dropped.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    generation: Arc<watch::Sender<u64>>,
}

impl TokenStore {
    /// Create a token store over the given persistence backend.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            store,
            generation: Arc::new(generation),
        }
    }

    /// Generation of the stored credential. Changes on every save or clear.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Be notified whenever the credential is replaced or removed.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Persist a credential, overwriting any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the credential cannot be written.
    pub fn save(&self, token: &str, expires_at: Option<i64>) -> Result<(), StorageError> {
        let stored = StoredCredential {
            token: token.to_owned(),
            expires_at,
        };
        self.store.set(TOKEN_KEY, &serde_json::to_string(&stored)?)?;
        self.advance();
        Ok(())
    }

    /// Current credential, or `None` when absent.
    ///
    /// Never fails: storage errors are logged and read as "absent". A stored
    /// value that is not a JSON credential document is taken as a bare token
    /// with no expiry.
    #[must_use]
    pub fn get(&self) -> Option<Credential> {
        let raw = match self.store.get(TOKEN_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored credential");
                return None;
            }
        };

        let (token, expires_at) = match serde_json::from_str::<StoredCredential>(&raw) {
            Ok(stored) => (stored.token, stored.expires_at),
            Err(_) => (raw, None),
        };

        let token = token.trim();
        if token.is_empty() || NULLISH_TOKENS.contains(&token) {
            return None;
        }

        Some(Credential::new(token, expires_at))
    }

    /// Remove the credential. Idempotent; storage errors are logged.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            tracing::warn!(error = %e, "Failed to clear stored credential");
        }
        self.advance();
    }

    fn advance(&self) {
        self.generation.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}
