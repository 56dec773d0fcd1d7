//! Sign-in, session expiry and the cart's reaction to losing the session.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;

use sdcart_client::auth::{AuthError, SessionError};
use sdcart_client::cart::CartPhase;
use sdcart_client::gateway::ApiError;
use sdcart_core::ProductId;
use sdcart_integration_tests::{EMAIL, FAR_FUTURE, MockBackend, PASSWORD, cart_entry, make_jwt};

#[tokio::test]
async fn test_login_stores_token_with_expiry() {
    let backend = MockBackend::start().await;
    let context = backend.context();

    let claims = context
        .login(EMAIL, &SecretString::from(PASSWORD))
        .await
        .unwrap();

    assert_eq!(claims.sub, EMAIL);
    assert_eq!(claims.role.as_deref(), Some("USER"));
    let credential = context.session().tokens().get().unwrap();
    assert_eq!(credential.expires_at(), Some(FAR_FUTURE));
    assert!(context.session().is_authenticated());
}

#[tokio::test]
async fn test_rejected_login_stores_nothing() {
    let backend = MockBackend::start().await;
    let context = backend.context();

    let err = context
        .login(EMAIL, &SecretString::from("wrong"))
        .await
        .unwrap_err();

    match err {
        AuthError::Api(api) => {
            assert_eq!(api.status(), Some(401));
            assert!(api.to_string().contains("Invalid email or password"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(context.session().tokens().get().is_none());
    assert_eq!(context.cart().phase(), CartPhase::Uninitialized);
}

#[tokio::test]
async fn test_invalid_email_is_not_sent() {
    let backend = MockBackend::start().await;
    let context = backend.context();

    let err = context
        .login("not-an-email", &SecretString::from(PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidEmail(_)));
    assert!(backend.requests_to("POST", "/api/auth/login").is_empty());
}

#[tokio::test]
async fn test_cleared_token_is_unauthenticated() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    context.session().tokens().clear();

    assert_eq!(
        context.session().ensure_valid(),
        Err(SessionError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_expired_credential_is_cleared() {
    let backend = MockBackend::start().await;
    let context = backend.context();
    context
        .session()
        .tokens()
        .save(&make_jwt(EMAIL, 1), Some(1))
        .unwrap();

    assert_eq!(context.session().ensure_valid(), Err(SessionError::Expired));
    assert!(context.session().tokens().get().is_none());
    assert_eq!(
        context.session().ensure_valid(),
        Err(SessionError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_expired_session_empties_cart_without_request() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![cart_entry(1, "A", 100, 1)];
    let context = backend.signed_in().await;
    assert_eq!(context.cart().count(), 1);

    context
        .session()
        .tokens()
        .save(&make_jwt(EMAIL, 1), Some(1))
        .unwrap();
    backend.forget_requests();

    let err = context
        .cart()
        .try_add(ProductId::from("B"), std::num::NonZeroU32::MIN)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Session(SessionError::Expired)));
    assert!(err.requires_login());
    assert_eq!(context.cart().count(), 0);
    assert_eq!(context.cart().phase(), CartPhase::Ready);
    assert!(backend.state().requests.is_empty());
}

#[tokio::test]
async fn test_reload_without_session_is_empty() {
    let backend = MockBackend::start().await;
    let context = backend.context();

    context.cart().reload().await;

    assert_eq!(context.cart().count(), 0);
    assert_eq!(context.cart().phase(), CartPhase::Ready);
    assert!(backend.requests_to("GET", "/api/cart").is_empty());
}

#[tokio::test]
async fn test_logout_forgets_session_and_cart() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![cart_entry(1, "A", 100, 1)];
    let context = backend.signed_in().await;

    context.logout();

    assert!(!context.session().is_authenticated());
    assert_eq!(context.cart().count(), 0);
    assert_eq!(context.cart().phase(), CartPhase::Uninitialized);
    assert!(!context.cart().clear().await);
}

#[tokio::test]
async fn test_account_info_unwraps_user() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let profile = context.auth().account_info().await.unwrap();

    assert_eq!(profile.email.as_deref(), Some(EMAIL));
    assert_eq!(profile.full_name().as_deref(), Some("Asha Rao"));
}

#[tokio::test]
async fn test_server_rejection_of_token_is_not_a_session_error() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;
    backend.state().token = make_jwt("someone-else@example.com", FAR_FUTURE);

    let err = context.auth().account_info().await.unwrap_err();

    match err {
        AuthError::Api(api) => {
            assert_eq!(api.status(), Some(401));
            assert!(!api.requires_login());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(context.session().is_authenticated());
}

#[tokio::test]
async fn test_expiry_found_by_catalog_empties_cart() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![cart_entry(1, "A", 100, 1)];
    let context = backend.signed_in().await;
    assert_eq!(context.cart().count(), 1);

    context
        .session()
        .tokens()
        .save(&make_jwt(EMAIL, 1), Some(1))
        .unwrap();
    let err = context.catalog().category("kitchen").await.unwrap_err();

    assert!(matches!(err, ApiError::Session(SessionError::Expired)));
    assert!(context.session().tokens().get().is_none());
    assert_eq!(context.cart().count(), 0);
    assert!(context.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_auth_logout_empties_cart() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![cart_entry(1, "A", 100, 1)];
    let context = backend.signed_in().await;

    context.auth().logout();

    assert!(context.session().tokens().get().is_none());
    assert_eq!(context.cart().count(), 0);
    assert_eq!(context.cart().total(), sdcart_core::Price::ZERO);
}

#[tokio::test]
async fn test_auth_login_drops_previous_cart() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![cart_entry(1, "A", 100, 1)];
    let context = backend.signed_in().await;

    context
        .auth()
        .login(EMAIL, &SecretString::from(PASSWORD))
        .await
        .unwrap();

    assert_eq!(context.cart().count(), 0);
    context.cart().reload().await;
    assert_eq!(context.cart().count(), 1);
}

#[tokio::test]
async fn test_cart_subscribers_notified_of_logout() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![cart_entry(1, "A", 100, 1)];
    let context = backend.signed_in().await;
    let mut updates = context.cart().subscribe();

    context.auth().logout();
    updates.changed().await.unwrap();

    assert!(updates.borrow().items.is_empty());
}
