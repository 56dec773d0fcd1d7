//! Cart line items as returned by the cart endpoints.

use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::{CartItemId, ProductId};
use super::price::Price;

/// One row of the user's server-side cart.
///
/// `id` identifies the cart entry; `product_id` identifies the catalog
/// product. Entries are looked up and removed by `id` only.
///
/// Wire shape: `{id, productId, name, price, imageUrl, quantity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Server-assigned cart-entry id.
    pub id: CartItemId,
    /// Catalog id of the product in this entry.
    pub product_id: ProductId,
    /// Product display name.
    #[serde(default)]
    pub name: String,
    /// Per-line price as reported by the server.
    ///
    /// This is the line's price, not unit price times quantity; cart totals
    /// sum it directly.
    #[serde(default)]
    pub price: Price,
    /// Number of units; always at least one.
    #[serde(default = "default_quantity")]
    pub quantity: NonZeroU32,
    /// Product image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

const fn default_quantity() -> NonZeroU32 {
    NonZeroU32::MIN
}
