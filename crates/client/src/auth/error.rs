//! Authentication error types.

use thiserror::Error;

use sdcart_core::EmailError;

use super::decoder::DecodeError;
use crate::gateway::ApiError;
use crate::storage::StorageError;

/// Errors that can occur during sign-in, registration and account lookups.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password left blank.
    #[error("Please enter both email and password")]
    MissingCredentials,

    /// Email is not well-formed.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// A required registration field is blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Login succeeded but the response carried no token.
    #[error("No token returned from server")]
    MissingToken,

    /// Login returned a token whose claims cannot be read.
    #[error("Server returned an unreadable token: {0}")]
    InvalidToken(#[from] DecodeError),

    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Credential could not be persisted.
    #[error("Failed to store credential: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Whether the user has to sign in again before retrying.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Api(api) if api.requires_login())
    }
}
