//! Client-side cart synchronized with the server cart.
//!
//! [`CartStore`] keeps a local snapshot of `/api/cart` and publishes it,
//! together with a [`CartPhase`], through a `tokio::sync::watch` channel.
//! The snapshot only changes after the server confirms an operation:
//!
//! | Operation | Request                       | On success                 |
//! |-----------|-------------------------------|----------------------------|
//! | reload    | `GET /api/cart`               | replace snapshot wholesale |
//! | add       | `POST /api/cart/add`          | replace-or-append by product |
//! | remove    | `DELETE /api/cart/remove/{id}`| drop the entry             |
//! | clear     | `DELETE /api/cart/clear`      | empty the snapshot         |
//!
//! A failed mutation leaves the snapshot untouched, except when the session
//! is gone: then the snapshot is emptied so no stale cart outlives its owner.
//! The store follows the [`TokenStore`](crate::auth::TokenStore) generation,
//! so the snapshot is also dropped when the credential is cleared or
//! replaced outside the cart (logout, an expiry found by another client,
//! signing in as someone else). A response that lands after such a change
//! is discarded.
//!
//! No lock is held across a request. Overlapping calls race and the last
//! response to land wins.

mod snapshot;

pub use snapshot::CartSnapshot;

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde_json::json;
use tokio::sync::watch;
use tracing::instrument;

use sdcart_core::{CartItem, CartItemId, Price, ProductId};

use crate::gateway::{ApiError, Method, Payload, RequestGateway};
use crate::telemetry::add_breadcrumb;

/// Lifecycle of the local snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartPhase {
    /// Nothing loaded yet.
    #[default]
    Uninitialized,
    /// A reload is in flight.
    Loading,
    /// Snapshot reflects the last completed operation.
    Ready,
    /// An add, remove or clear is in flight.
    Mutating,
}

/// Value published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub items: CartSnapshot,
    pub phase: CartPhase,
}

/// Outcome of [`CartStore::remove_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkRemoval {
    /// Entries the server removed.
    pub removed: Vec<CartItemId>,
    /// Entries whose removal failed; they stay in the cart.
    pub failed: Vec<CartItemId>,
    /// Ids that were not in the snapshot; no request was sent.
    pub skipped: Vec<CartItemId>,
}

impl BulkRemoval {
    /// Whether every requested entry was removed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Server-synchronized cart.
///
/// Cheap to clone; clones share the same snapshot.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    gateway: RequestGateway,
    state: watch::Sender<CartState>,
    /// Credential generation the snapshot belongs to.
    generation: AtomicU64,
}

impl CartStore {
    /// Create an empty, uninitialized cart.
    ///
    /// Inside a tokio runtime a watcher task is spawned so subscribers see
    /// the cart emptied as soon as the credential changes. Without one, the
    /// change is picked up by the next read or operation.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        let (state, _) = watch::channel(CartState::default());
        let generation = AtomicU64::new(gateway.session().tokens().generation());
        let changes = gateway.session().tokens().subscribe();

        let inner = Arc::new(CartStoreInner {
            gateway,
            state,
            generation,
        });

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(follow_session(Arc::downgrade(&inner), changes));
        }

        Self { inner }
    }

    /// Receive every published [`CartState`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.sync_session();
        self.inner.state.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.sync_session();
        self.inner.state.borrow().clone()
    }

    /// Current entries.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CartItem> {
        self.sync_session();
        self.inner.state.borrow().items.items().to_vec()
    }

    #[must_use]
    pub fn phase(&self) -> CartPhase {
        self.inner.state.borrow().phase
    }

    /// Sum of line prices.
    #[must_use]
    pub fn total(&self) -> Price {
        self.sync_session();
        self.inner.state.borrow().items.total()
    }

    /// Number of entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sync_session();
        self.inner.state.borrow().items.count()
    }

    /// Replace the snapshot with the server cart.
    ///
    /// Never fails: any error leaves an empty cart and a warning.
    #[instrument(skip(self))]
    pub async fn reload(&self) {
        self.sync_session();
        let generation = self.generation();
        self.inner
            .state
            .send_modify(|state| state.phase = CartPhase::Loading);

        let mut items = match self.fetch().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load cart; showing an empty cart");
                CartSnapshot::default()
            }
        };

        self.sync_session();
        if self.generation() != generation {
            tracing::info!("Session changed during reload; discarding response");
            items.clear();
        }

        tracing::debug!(count = items.count(), "Cart loaded");
        self.inner.state.send_modify(|state| {
            state.items = items;
            state.phase = CartPhase::Ready;
        });
    }

    async fn fetch(&self) -> Result<CartSnapshot, ApiError> {
        let payload = self
            .inner
            .gateway
            .authorized_request(Method::Get, "/api/cart", None)
            .await?;

        if !matches!(payload, Payload::Array(_)) {
            tracing::warn!("Cart response is not a list; treating it as empty");
        }

        let items = payload
            .into_array()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<CartItem>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable cart entry");
                    None
                }
            });

        Ok(CartSnapshot::from_items(items))
    }

    /// Add a product. Returns whether the server accepted it.
    ///
    /// A zero quantity is rejected without a request.
    pub async fn add(&self, product_id: impl Into<ProductId>, quantity: u32) -> bool {
        let product_id = product_id.into();
        let Some(quantity) = NonZeroU32::new(quantity) else {
            tracing::warn!(product_id = %product_id, "Refusing to add zero quantity");
            return false;
        };

        match self.try_add(product_id, quantity).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to add to cart");
                false
            }
        }
    }

    /// Add a product, returning the entry the server created or updated.
    ///
    /// An existing entry for the same product is replaced by the response,
    /// not summed with it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the session is invalid, the request fails or
    /// the response is not a cart item.
    #[instrument(skip(self))]
    pub async fn try_add(
        &self,
        product_id: ProductId,
        quantity: NonZeroU32,
    ) -> Result<CartItem, ApiError> {
        let generation = self.begin_mutation();

        let body = json!({
            "productId": product_id.as_str(),
            "quantity": quantity.get(),
        });
        let result = self
            .inner
            .gateway
            .authorized_request(Method::Post, "/api/cart/add", Some(&body))
            .await
            .and_then(Payload::decode::<CartItem>);

        self.settle(generation, &result, |items, item| items.upsert_by_product(item.clone()));

        if let Ok(item) = &result {
            let quantity = quantity.to_string();
            add_breadcrumb(
                "cart",
                "Added item",
                Some(&[
                    ("product_id", product_id.as_str()),
                    ("quantity", quantity.as_str()),
                ]),
            );
            tracing::info!(item_id = %item.id, "Added to cart");
        }
        result
    }

    /// Remove an entry. Returns whether the server removed it.
    pub async fn remove(&self, item: &CartItem) -> bool {
        match self.try_remove(item).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, item_id = %item.id, "Failed to remove cart item");
                false
            }
        }
    }

    /// Remove an entry by its cart-entry id.
    ///
    /// Removing an id that is not in the snapshot still calls the server
    /// and leaves the snapshot unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the session is invalid or the request fails.
    pub async fn try_remove(&self, item: &CartItem) -> Result<(), ApiError> {
        self.remove_id(item.id).await
    }

    #[instrument(skip(self))]
    async fn remove_id(&self, id: CartItemId) -> Result<(), ApiError> {
        let generation = self.begin_mutation();

        let path = format!("/api/cart/remove/{id}");
        let result = self
            .inner
            .gateway
            .authorized_request(Method::Delete, &path, None)
            .await
            .map(drop);

        self.settle(generation, &result, |items, _| {
            items.remove_entry(id);
        });

        if result.is_ok() {
            let item_id = id.to_string();
            add_breadcrumb("cart", "Removed item", Some(&[("item_id", item_id.as_str())]));
        }
        result
    }

    /// Remove every entry. Returns whether the server cleared the cart.
    pub async fn clear(&self) -> bool {
        match self.try_clear().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear cart");
                false
            }
        }
    }

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the session is invalid or the request fails.
    #[instrument(skip(self))]
    pub async fn try_clear(&self) -> Result<(), ApiError> {
        let generation = self.begin_mutation();

        let result = self
            .inner
            .gateway
            .authorized_request(Method::Delete, "/api/cart/clear", None)
            .await
            .map(drop);

        self.settle(generation, &result, |items, _| items.clear());

        if result.is_ok() {
            add_breadcrumb("cart", "Cleared cart", None);
        }
        result
    }

    /// Remove several entries, one request each.
    ///
    /// Not atomic: a failure does not stop the remaining removals, and
    /// earlier removals stay committed. Ids absent from the snapshot are
    /// skipped.
    #[instrument(skip(self, ids))]
    pub async fn remove_many(&self, ids: &[CartItemId]) -> BulkRemoval {
        let mut outcome = BulkRemoval::default();

        for &id in ids {
            self.sync_session();
            if !self.inner.state.borrow().items.contains(id) {
                outcome.skipped.push(id);
                continue;
            }

            match self.remove_id(id).await {
                Ok(()) => outcome.removed.push(id),
                Err(e) => {
                    tracing::warn!(error = %e, item_id = %id, "Failed to remove cart item");
                    outcome.failed.push(id);
                }
            }
        }

        tracing::info!(
            removed = outcome.removed.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            "Bulk removal finished"
        );
        outcome
    }

    /// Place the order: clear the cart and return what it totalled.
    ///
    /// No payment is taken.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the session is invalid or the clear fails; the
    /// cart is left as it was.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<Price, ApiError> {
        let total = self.total();
        let count = self.count();

        self.try_clear().await?;

        let display_total = total.display();
        add_breadcrumb("cart", "Placed order", Some(&[("total", display_total.as_str())]));
        tracing::info!(total = %total, items = count, "Order placed");
        Ok(total)
    }

    /// Forget the local snapshot without contacting the server.
    pub fn discard(&self) {
        self.inner.state.send_replace(CartState::default());
    }

    /// Mark a mutation in flight. Returns the generation it runs under.
    fn begin_mutation(&self) -> u64 {
        self.sync_session();
        self.inner
            .state
            .send_modify(|state| state.phase = CartPhase::Mutating);
        self.generation()
    }

    /// Apply a finished operation to the snapshot and return to `Ready`.
    ///
    /// A result from an earlier credential generation is not applied.
    fn settle<T>(
        &self,
        generation: u64,
        result: &Result<T, ApiError>,
        apply: impl FnOnce(&mut CartSnapshot, &T),
    ) {
        self.sync_session();
        let stale = self.generation() != generation;

        self.inner.state.send_modify(|state| {
            match result {
                Err(ApiError::Session(reason)) => {
                    tracing::info!(%reason, "Session ended; emptying cart");
                    state.items.clear();
                }
                _ if stale => {
                    tracing::info!("Session changed during request; discarding response");
                    state.items.clear();
                }
                Ok(value) => apply(&mut state.items, value),
                Err(_) => {}
            }
            state.phase = CartPhase::Ready;
        });
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Drop the snapshot if the credential changed since it was built.
    fn sync_session(&self) {
        let current = self.inner.gateway.session().tokens().generation();
        if self.generation() == current {
            return;
        }

        self.inner.state.send_if_modified(|state| {
            if self.inner.generation.swap(current, Ordering::AcqRel) == current {
                return false;
            }
            if state.items.is_empty() {
                return false;
            }
            tracing::info!(count = state.items.count(), "Credential changed; emptying cart");
            state.items.clear();
            true
        });
    }
}

/// Empty the cart whenever the credential changes, until the store is dropped.
async fn follow_session(store: Weak<CartStoreInner>, mut changes: watch::Receiver<u64>) {
    while changes.changed().await.is_ok() {
        let Some(inner) = store.upgrade() else {
            break;
        };
        CartStore { inner }.sync_session();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{JwtDecoder, SessionError, SessionGuard, TokenStore};
    use crate::config::ClientConfig;
    use crate::storage::MemoryStore;

    fn signed_out_store() -> CartStore {
        let config = ClientConfig::new(url::Url::parse("http://127.0.0.1:9").unwrap());
        let session = SessionGuard::new(
            TokenStore::new(Arc::new(MemoryStore::new())),
            Arc::new(JwtDecoder),
        );
        CartStore::new(RequestGateway::new(&config, session).unwrap())
    }

    #[test]
    fn test_starts_uninitialized_and_empty() {
        let cart = signed_out_store();
        assert_eq!(cart.phase(), CartPhase::Uninitialized);
        assert_eq!(cart.count(), 0);
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_reload_without_session_is_empty_and_ready() {
        let cart = signed_out_store();
        cart.reload().await;

        assert_eq!(cart.phase(), CartPhase::Ready);
        assert!(cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_locally() {
        let cart = signed_out_store();
        let rx = cart.subscribe();

        assert!(!cart.add("A", 0).await);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_mutation_without_session_reports_session_error() {
        let cart = signed_out_store();

        let err = cart.try_clear().await.unwrap_err();
        assert!(matches!(err, ApiError::Session(SessionError::Unauthenticated)));
        assert_eq!(cart.phase(), CartPhase::Ready);
        assert!(!cart.clear().await);
    }

    #[tokio::test]
    async fn test_remove_many_skips_unknown_ids() {
        let cart = signed_out_store();
        let outcome = cart
            .remove_many(&[CartItemId::new(1), CartItemId::new(2)])
            .await;

        assert!(outcome.removed.is_empty());
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
        assert!(outcome.is_complete());
    }

    fn item(id: i64, product: &str) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::from(product),
            name: product.to_owned(),
            price: Price::from_units(100),
            quantity: NonZeroU32::MIN,
            image_url: None,
        }
    }

    fn fill(cart: &CartStore, items: Vec<CartItem>) {
        cart.inner
            .state
            .send_modify(|state| state.items = CartSnapshot::from_items(items));
    }

    #[test]
    fn test_cleared_credential_empties_cart() {
        let cart = signed_out_store();
        fill(&cart, vec![item(1, "A")]);
        assert_eq!(cart.count(), 1);

        cart.inner.gateway.session().tokens().clear();

        assert_eq!(cart.count(), 0);
        assert_eq!(cart.total(), Price::ZERO);
        assert!(cart.snapshot().is_empty());
    }

    #[test]
    fn test_new_credential_empties_cart() {
        let cart = signed_out_store();
        fill(&cart, vec![item(1, "A")]);

        cart.inner
            .gateway
            .session()
            .tokens()
            .save("someone-else", None)
            .unwrap();

        assert!(cart.state().items.is_empty());
    }

    #[test]
    fn test_response_from_previous_session_is_not_applied() {
        let cart = signed_out_store();
        let generation = cart.begin_mutation();
        cart.inner.gateway.session().tokens().clear();

        let result: Result<CartItem, ApiError> = Ok(item(2, "B"));
        cart.settle(generation, &result, |items, item| {
            items.upsert_by_product(item.clone());
        });

        assert_eq!(cart.count(), 0);
        assert_eq!(cart.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_subscribers_see_credential_loss() {
        let cart = signed_out_store();
        fill(&cart, vec![item(1, "A")]);
        let mut rx = cart.subscribe();

        cart.inner.gateway.session().tokens().clear();
        rx.changed().await.unwrap();

        assert!(rx.borrow().items.is_empty());
    }

    #[test]
    fn test_discard_resets_state() {
        let cart = signed_out_store();
        cart.inner.state.send_modify(|state| state.phase = CartPhase::Ready);
        cart.discard();
        assert_eq!(cart.state(), CartState::default());
    }
}
