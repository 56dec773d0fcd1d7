//! Cache types for catalog responses.

use std::sync::Arc;

use sdcart_core::{Product, ProductId, ProductSummary};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Summaries,
    Product(ProductId),
    Image(ProductId),
    Category(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Summaries(Arc<Vec<ProductSummary>>),
    Product(Box<Product>),
    Image(Arc<str>),
    Products(Arc<Vec<Product>>),
}
