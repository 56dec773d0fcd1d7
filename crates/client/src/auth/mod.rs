//! Authentication: credential storage, session validation and sign-in.
//!
//! # Flow
//!
//! 1. [`AuthService::login`] posts credentials, decodes the returned JWT and
//!    persists it through the [`TokenStore`] with the token's expiry.
//! 2. Every authorized call asks the [`SessionGuard`] for the token; expired
//!    or undecodable credentials are cleared on detection.
//! 3. [`AuthService::logout`] clears the credential and the Sentry user.

mod decoder;
mod error;
mod session;
mod token_store;

pub use decoder::{DecodeError, JwtDecoder, TokenDecoder};
pub use error::AuthError;
pub use session::{SessionError, SessionGuard};
pub use token_store::{Credential, TOKEN_KEY, TokenStore};

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::instrument;

use sdcart_core::{Claims, Email, UserProfile};

use crate::gateway::{Method, Payload, RequestGateway};
use crate::telemetry::{add_breadcrumb, clear_sentry_user, set_sentry_user};

/// New account details.
///
/// `Debug` output redacts both password fields.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth as entered (`YYYY-MM-DD`).
    pub dob: String,
    pub mobile: String,
    pub alt_mobile: Option<String>,
}

impl Registration {
    /// Check the form before it is sent.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in form order.
    pub fn validate(&self) -> Result<Email, AuthError> {
        let email = Email::parse(&self.email)?;

        if self.password.expose_secret().is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }

        for (name, value) in [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("dob", &self.dob),
            ("mobile", &self.mobile),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::MissingField(name));
            }
        }

        Ok(email)
    }
}

/// Sign-in, registration and account lookups.
#[derive(Clone)]
pub struct AuthService {
    gateway: RequestGateway,
}

impl AuthService {
    /// Create an auth service on top of a gateway.
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Exchange email and password for a stored session.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` / `InvalidEmail` for bad input (nothing is sent)
    /// - `Api` if the backend rejects the credentials
    /// - `MissingToken` / `InvalidToken` if the response carries no usable JWT
    /// - `Storage` if the credential cannot be persisted
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Claims, AuthError> {
        if email.trim().is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let email = Email::parse(email)?;

        let body = json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        let payload = self
            .gateway
            .public_request(Method::Post, "/api/auth/login", Some(&body))
            .await?;

        let token = token_from(payload).ok_or(AuthError::MissingToken)?;
        let claims = self.gateway.session().decode(&token)?;
        self.gateway.session().tokens().save(&token, claims.exp)?;

        set_sentry_user(&claims.sub, Some(email.as_str()));
        add_breadcrumb("auth", "Signed in", None);
        tracing::info!(subject = %claims.sub, "Signed in");

        Ok(claims)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns a validation error before sending, or `Api` if the backend
    /// refuses the registration.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<(), AuthError> {
        let email = registration.validate()?;

        let body = json!({
            "email": email.as_str(),
            "password": registration.password.expose_secret(),
            "firstName": registration.first_name.trim(),
            "lastName": registration.last_name.trim(),
            "dob": registration.dob.trim(),
            "mobile": registration.mobile.trim(),
            "altMobile": registration.alt_mobile.as_deref().map_or("", str::trim),
        });
        self.gateway
            .public_request(Method::Post, "/api/auth/register", Some(&body))
            .await?;

        tracing::info!("Registered account");
        Ok(())
    }

    /// Forget the stored credential. Idempotent.
    pub fn logout(&self) {
        self.gateway.session().tokens().clear();
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        tracing::info!("Signed out");
    }

    /// Claims of the current session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when there is no usable session.
    pub fn current_user(&self) -> Result<Claims, SessionError> {
        self.gateway.session().claims()
    }

    /// Account details from the backend.
    ///
    /// Accepts both `{"user": {...}}` and the bare user object.
    ///
    /// # Errors
    ///
    /// Returns `Api` if the session is invalid or the request fails.
    #[instrument(skip(self))]
    pub async fn account_info(&self) -> Result<UserProfile, AuthError> {
        let payload = self
            .gateway
            .authorized_request(Method::Get, "/api/user/userinfo", None)
            .await?;

        let payload = match payload {
            Payload::Object(mut map) => match map.remove("user") {
                Some(Value::Object(user)) => Payload::Object(user),
                Some(other) => {
                    map.insert("user".to_owned(), other);
                    Payload::Object(map)
                }
                None => Payload::Object(map),
            },
            other => other,
        };

        Ok(payload.decode()?)
    }
}

/// Bearer token from a login response.
fn token_from(payload: Payload) -> Option<String> {
    let token = match payload {
        Payload::Object(mut map) => match map.remove("token") {
            Some(Value::String(token)) => token,
            _ => return None,
        },
        _ => return None,
    };

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}
