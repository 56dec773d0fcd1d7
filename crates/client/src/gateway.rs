//! HTTP boundary to the SDCart backend.
//!
//! [`RequestGateway`] is the only type in the crate that talks to the network.
//! Authorized calls pass through the [`SessionGuard`] first and carry
//! `Authorization: Bearer <token>`; public calls (login, register)
//! skip the guard. Every response body is normalized into a [`Payload`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::auth::{SessionError, SessionGuard};
use crate::config::ClientConfig;

/// Longest slice of a non-JSON error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors returned by the gateway and the components built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session guard refused the request.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Transport failure or non-2xx response. `status` is `None` when no
    /// response arrived.
    #[error("request failed: {message}")]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// Response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Path could not be joined onto the base URL.
    #[error("invalid request path {path:?}: {source}")]
    InvalidUrl {
        path: String,
        source: url::ParseError,
    },
}

impl ApiError {
    /// Whether the user has to sign in again before retrying.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// HTTP status of a failed response, if one arrived.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    fn decode(error: impl fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }
}

/// HTTP verbs used by the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// A response body, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No body, or a JSON `null`.
    Empty,
    /// JSON array.
    Array(Vec<Value>),
    /// JSON object.
    Object(Map<String, Value>),
    /// JSON string, number or boolean.
    Scalar(Value),
    /// Body that is not JSON at all.
    Text(String),
}

impl Payload {
    /// Classify a raw response body.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return Self::Empty;
        }

        serde_json::from_str::<Value>(body)
            .map_or_else(|_| Self::Text(body.to_owned()), Self::from_value)
    }

    /// Classify an already-parsed JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Array(items) => Self::Array(items),
            Value::Object(map) => Self::Object(map),
            scalar => Self::Scalar(scalar),
        }
    }

    /// Array elements, or an empty list for any other shape.
    #[must_use]
    pub fn into_array(self) -> Vec<Value> {
        match self {
            Self::Array(items) => items,
            _ => Vec::new(),
        }
    }

    /// Text content of a `Text` or JSON string payload.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) | Self::Scalar(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// Deserialize the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the payload is plain text or does not
    /// match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Self::Empty => Value::Null,
            Self::Array(items) => Value::Array(items),
            Self::Object(map) => Value::Object(map),
            Self::Scalar(value) => value,
            Self::Text(text) => {
                return Err(ApiError::Decode(format!(
                    "expected JSON, got text: {}",
                    truncate(&text)
                )));
            }
        };
        serde_json::from_value(value).map_err(ApiError::decode)
    }
}

/// The single network boundary.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<RequestGatewayInner>,
}

struct RequestGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    session: SessionGuard,
}

impl RequestGateway {
    /// Build a gateway for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, session: SessionGuard) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(RequestGatewayInner {
                client,
                base_url,
                session,
            }),
        })
    }

    /// Session guard consulted before authorized calls.
    #[must_use]
    pub fn session(&self) -> &SessionGuard {
        &self.inner.session
    }

    /// Backend origin requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Issue one authenticated request.
    ///
    /// # Errors
    ///
    /// - `ApiError::Session` if the session guard rejects the credential;
    ///   no request is sent
    /// - `ApiError::RequestFailed` on transport failure or non-2xx status
    #[instrument(skip(self, body))]
    pub async fn authorized_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Payload, ApiError> {
        let token = self.inner.session.ensure_valid()?;
        self.send(method, path, body, Some(&token)).await
    }

    /// Issue one request without credentials.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RequestFailed` on transport failure or non-2xx status.
    #[instrument(skip(self, body))]
    pub async fn public_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Payload, ApiError> {
        self.send(method, path, body, None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Payload, ApiError> {
        let url = self.url(path)?;

        let mut request = self.inner.client.request(method.into(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request did not complete");
            ApiError::RequestFailed {
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %truncate(&text),
                "Backend returned non-success status"
            );
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message: failure_message(status, &text),
            });
        }

        Ok(Payload::from_body(&text))
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ApiError::InvalidUrl {
                path: path.to_owned(),
                source,
            })
    }
}

/// Server `message` field, else the body text, else the status line.
fn failure_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Payload::Object(map) = Payload::from_body(body)
        && let Some(Value::String(message)) = map.get("message")
        && !message.trim().is_empty()
    {
        return message.clone();
    }

    let text = body.trim();
    if text.is_empty() {
        format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
        .trim_end()
        .to_owned()
    } else {
        truncate(text)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{JwtDecoder, TokenStore};
    use crate::storage::MemoryStore;

    fn gateway(api_url: &str) -> RequestGateway {
        let config = ClientConfig::new(Url::parse(api_url).unwrap());
        let session = SessionGuard::new(
            TokenStore::new(Arc::new(MemoryStore::new())),
            Arc::new(JwtDecoder),
        );
        RequestGateway::new(&config, session).unwrap()
    }

    #[test]
    fn test_payload_shapes() {
        assert_eq!(Payload::from_body(""), Payload::Empty);
        assert_eq!(Payload::from_body("  null "), Payload::Empty);
        assert!(matches!(Payload::from_body("[1,2]"), Payload::Array(v) if v.len() == 2));
        assert!(matches!(Payload::from_body(r#"{"a":1}"#), Payload::Object(_)));
        assert_eq!(Payload::from_body("true"), Payload::Scalar(Value::Bool(true)));
        assert_eq!(
            Payload::from_body("Item removed"),
            Payload::Text("Item removed".to_owned())
        );
    }

    #[test]
    fn test_into_array_coerces() {
        assert!(Payload::from_body(r#"{"items":[]}"#).into_array().is_empty());
        assert!(Payload::Empty.into_array().is_empty());
        assert_eq!(Payload::from_body("[{}]").into_array().len(), 1);
    }

    #[test]
    fn test_decode_rejects_text() {
        let err = Payload::Text("<html>".to_owned())
            .decode::<Value>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_failure_message_prefers_server_message() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            failure_message(status, r#"{"message":"Out of stock","status":400}"#),
            "Out of stock"
        );
        assert_eq!(failure_message(status, "plain failure"), "plain failure");
        assert_eq!(failure_message(status, ""), "HTTP 400 Bad Request");
        assert_eq!(failure_message(status, &"x".repeat(500)).len(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn test_urls_join_onto_base_path() {
        let gateway = gateway("http://localhost:8080/backend");
        assert_eq!(
            gateway.url("/api/cart").unwrap().as_str(),
            "http://localhost:8080/backend/api/cart"
        );
        assert_eq!(
            gateway.url("products/search?query=tv").unwrap().as_str(),
            "http://localhost:8080/backend/products/search?query=tv"
        );
    }

    #[tokio::test]
    async fn test_authorized_request_without_session_sends_nothing() {
        // Port 9 (discard) would fail the request if one were sent.
        let gateway = gateway("http://127.0.0.1:9");
        let err = gateway
            .authorized_request(Method::Get, "/api/cart", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Session(SessionError::Unauthenticated)));
        assert!(err.requires_login());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(Method::Delete), reqwest::Method::DELETE);
        assert_eq!(Method::Put.to_string(), "PUT");
    }
}
