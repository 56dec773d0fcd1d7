//! Saved delivery address.
//!
//! The backend keeps one address per account but may return it either as a
//! single object or as a list; [`AddressBook::current`] accepts both.

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use sdcart_core::{Address, AddressId, AddressInput};

use crate::gateway::{ApiError, Method, Payload, RequestGateway};
use crate::telemetry::add_breadcrumb;

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// A required field is blank; nothing was sent.
    #[error("Please fill all required fields (missing {0})")]
    MissingField(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Delivery address operations.
#[derive(Clone)]
pub struct AddressBook {
    gateway: RequestGateway,
}

impl AddressBook {
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// The saved address, if any.
    ///
    /// A list response yields its first entry.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Api` if the request fails or the address
    /// cannot be decoded.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<Option<Address>, AddressError> {
        let payload = self
            .gateway
            .authorized_request(Method::Get, "/api/address", None)
            .await?;

        let value = match payload {
            Payload::Array(items) => items.into_iter().next(),
            Payload::Object(map) if !map.is_empty() => Some(Value::Object(map)),
            _ => None,
        };

        match value {
            Some(value) => Ok(Some(Payload::from_value(value).decode()?)),
            None => Ok(None),
        }
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` before sending if a required field is blank, or
    /// `Api` if the backend rejects it.
    #[instrument(skip(self, input))]
    pub async fn add(&self, input: &AddressInput) -> Result<(), AddressError> {
        self.submit(Method::Post, "/api/address/add".to_owned(), input)
            .await?;
        add_breadcrumb("address", "Added address", None);
        Ok(())
    }

    /// Replace the fields of an existing address.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add`].
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: AddressId, input: &AddressInput) -> Result<(), AddressError> {
        self.submit(Method::Put, format!("/api/address/{id}"), input)
            .await?;
        add_breadcrumb("address", "Updated address", None);
        Ok(())
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Api` if the request fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AddressId) -> Result<(), AddressError> {
        self.gateway
            .authorized_request(Method::Delete, &format!("/api/address/{id}"), None)
            .await?;
        add_breadcrumb("address", "Deleted address", None);
        Ok(())
    }

    async fn submit(
        &self,
        method: Method,
        path: String,
        input: &AddressInput,
    ) -> Result<(), AddressError> {
        if let Some(field) = input.first_missing() {
            return Err(AddressError::MissingField(field));
        }

        let body = serde_json::to_value(input).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.gateway
            .authorized_request(method, &path, Some(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{JwtDecoder, SessionGuard, TokenStore};
    use crate::config::ClientConfig;
    use crate::storage::MemoryStore;

    fn book() -> AddressBook {
        let config = ClientConfig::new(url::Url::parse("http://127.0.0.1:9").unwrap());
        let session = SessionGuard::new(
            TokenStore::new(Arc::new(MemoryStore::new())),
            Arc::new(JwtDecoder),
        );
        AddressBook::new(RequestGateway::new(&config, session).unwrap())
    }

    #[tokio::test]
    async fn test_blank_required_field_rejected_before_request() {
        let input = AddressInput {
            full_name: "Asha Rao".to_owned(),
            ..AddressInput::default()
        };

        let err = book().add(&input).await.unwrap_err();
        assert!(matches!(err, AddressError::MissingField("mobileNumber")));
    }

    #[tokio::test]
    async fn test_signed_out_lookup_is_session_error() {
        let err = book().current().await.unwrap_err();
        assert!(matches!(err, AddressError::Api(api) if api.requires_login()));
    }
}
