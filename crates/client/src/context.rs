//! Application context shared by every consumer.
//!
//! Built once at startup and cloned wherever it is needed; all components
//! inside share one credential store, one HTTP client and one cart snapshot.

use std::sync::Arc;

use secrecy::SecretString;

use sdcart_core::Claims;

use crate::address::AddressBook;
use crate::auth::{AuthError, AuthService, JwtDecoder, SessionGuard, TokenDecoder, TokenStore};
use crate::cart::CartStore;
use crate::catalog::CatalogClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::gateway::RequestGateway;
use crate::storage::KeyValueStore;

/// Process-wide client state.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: ClientConfig,
    gateway: RequestGateway,
    auth: AuthService,
    cart: CartStore,
    catalog: CatalogClient,
    addresses: AddressBook,
}

impl AppContext {
    /// Wire every component over the given persistence backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_decoder(config, store, Arc::new(JwtDecoder))
    }

    /// Same as [`Self::new`] with a custom token decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_decoder(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        decoder: Arc<dyn TokenDecoder>,
    ) -> Result<Self> {
        let session = SessionGuard::new(TokenStore::new(store), decoder);
        let gateway = RequestGateway::new(&config, session)?;

        Ok(Self {
            inner: Arc::new(AppContextInner {
                auth: AuthService::new(gateway.clone()),
                cart: CartStore::new(gateway.clone()),
                catalog: CatalogClient::new(gateway.clone(), config.catalog_cache),
                addresses: AddressBook::new(gateway.clone()),
                gateway,
                config,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn gateway(&self) -> &RequestGateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn session(&self) -> &SessionGuard {
        self.inner.gateway.session()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressBook {
        &self.inner.addresses
    }

    /// Sign in and load the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if sign-in fails; the cart is not touched.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> std::result::Result<Claims, AuthError> {
        let claims = self.inner.auth.login(email, password).await?;
        self.inner.cart.reload().await;
        Ok(claims)
    }

    /// Sign out and forget everything cached for the previous user.
    pub fn logout(&self) {
        self.inner.auth.logout();
        self.inner.cart.discard();
        self.inner.catalog.invalidate_all();
    }
}
