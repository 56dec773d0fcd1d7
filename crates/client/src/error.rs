//! Crate-level error type.
//!
//! Each component has its own error enum; [`ClientError`] unifies them for
//! callers (such as the CLI) that drive several components in one flow.

use thiserror::Error;

use crate::address::AddressError;
use crate::auth::{AuthError, SessionError};
use crate::config::ConfigError;
use crate::gateway::ApiError;
use crate::storage::StorageError;

/// Any error the client can produce.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// No usable session.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Sign-in or account operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Address operation failed.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Local state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Whether the user has to sign in again before retrying.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::Session(_) => true,
            Self::Api(api) | Self::Address(AddressError::Api(api)) => api.requires_login(),
            Self::Auth(auth) => auth.requires_login(),
            _ => false,
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_login() {
        assert!(ClientError::from(SessionError::Expired).requires_login());
        assert!(ClientError::from(ApiError::Session(SessionError::Unauthenticated)).requires_login());
        assert!(
            ClientError::from(AddressError::Api(ApiError::Session(SessionError::Expired)))
                .requires_login()
        );
        assert!(
            !ClientError::from(ApiError::RequestFailed {
                status: Some(500),
                message: "boom".to_owned(),
            })
            .requires_login()
        );
        assert!(!ClientError::from(AddressError::MissingField("city")).requires_login());
    }

    #[test]
    fn test_display_passes_through() {
        let err = ClientError::from(ApiError::RequestFailed {
            status: Some(400),
            message: "Out of stock".to_owned(),
        });
        assert_eq!(err.to_string(), "request failed: Out of stock");
    }
}
