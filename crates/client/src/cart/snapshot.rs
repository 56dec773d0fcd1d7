//! Local mirror of the server cart.

use sdcart_core::{CartItem, CartItemId, Price};

/// Ordered cart entries, unique by cart-entry id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    items: Vec<CartItem>,
}

impl CartSnapshot {
    /// Build a snapshot from a server list.
    ///
    /// Duplicate ids collapse into one entry: the later value wins, the
    /// earlier position is kept.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut snapshot = Self::default();
        for item in items {
            match snapshot.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(slot) => *slot = item,
                None => snapshot.items.push(item),
            }
        }
        snapshot
    }

    /// Entries in display order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Merge an item returned by an add.
    ///
    /// Replaces the entry for the same product (quantities are not summed),
    /// otherwise appends.
    pub fn upsert_by_product(&mut self, item: CartItem) {
        let product_id = item.product_id.clone();
        let item_id = item.id;
        let mut pending = Some(item);

        // The first entry for this product (or reusing this id) takes the new
        // value; any further duplicates are dropped.
        self.items.retain_mut(|existing| {
            if existing.product_id != product_id && existing.id != item_id {
                return true;
            }
            pending.take().is_some_and(|item| {
                *existing = item;
                true
            })
        });

        if let Some(item) = pending {
            self.items.push(item);
        }
    }

    /// Drop the entry with this id. Returns whether one was present.
    pub fn remove_entry(&mut self, id: CartItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Whether an entry with this id is present.
    #[must_use]
    pub fn contains(&self, id: CartItemId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of line prices. Quantity is not multiplied in.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(|item| item.price).sum()
    }

    /// Number of entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
