//! Product catalog reads.
//!
//! Listings, product details, images and category pages are cached using
//! `moka` (TTL and capacity from [`CatalogCacheConfig`]). Searches are not
//! cached.

mod cache;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, instrument};
use url::form_urlencoded;

use sdcart_core::{Price, Product, ProductId, ProductPage, ProductSummary};

use crate::config::CatalogCacheConfig;
use crate::gateway::{ApiError, Method, Payload, RequestGateway};

use cache::{CacheKey, CacheValue};

/// Filters for a product search.
///
/// The backend filters by brand and category; price bounds are applied to
/// the returned page locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

impl SearchQuery {
    /// Whether no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.query, &self.brand, &self.category]
            .into_iter()
            .all(|value| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    fn path(&self) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());
        params.append_pair("query", self.query.as_deref().unwrap_or_default().trim());
        for (name, value) in [("brand", &self.brand), ("category", &self.category)] {
            if let Some(value) = value.as_deref().map(str::trim)
                && !value.is_empty()
            {
                params.append_pair(name, value);
            }
        }
        format!("/products/search?{}", params.finish())
    }

    fn admits(&self, product: &Product) -> bool {
        self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
    }
}

/// Cached catalog client.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    gateway: RequestGateway,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a catalog client.
    #[must_use]
    pub fn new(gateway: RequestGateway, config: CatalogCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { gateway, cache }),
        }
    }

    /// Lightweight listing of every product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the response is not a list.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<ProductSummary>>, ApiError> {
        self.require_session()?;
        if let Some(CacheValue::Summaries(products)) =
            self.inner.cache.get(&CacheKey::Summaries).await
        {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let products: Arc<Vec<ProductSummary>> =
            Arc::new(self.get("/products/light").await?.decode()?);

        self.inner
            .cache
            .insert(CacheKey::Summaries, CacheValue::Summaries(products.clone()))
            .await;

        Ok(products)
    }

    /// Full details of one product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the product is unknown.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.require_session()?;
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .get(&format!("/products/product/{}", segment(id.as_str())))
            .await?
            .decode()?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Base64-encoded product image, as served by the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is not text.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_image(&self, id: &ProductId) -> Result<Arc<str>, ApiError> {
        self.require_session()?;
        let key = CacheKey::Image(id.clone());
        if let Some(CacheValue::Image(image)) = self.inner.cache.get(&key).await {
            return Ok(image);
        }

        let image: Arc<str> = self
            .get(&format!("/products/product/{}/image", segment(id.as_str())))
            .await?
            .into_text()
            .map(|text| Arc::from(text.trim()))
            .ok_or_else(|| ApiError::Decode("image response is not text".to_owned()))?;

        self.inner
            .cache
            .insert(key, CacheValue::Image(image.clone()))
            .await;

        Ok(image)
    }

    /// Products in a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the response has no products.
    #[instrument(skip(self))]
    pub async fn category(&self, name: &str) -> Result<Arc<Vec<Product>>, ApiError> {
        self.require_session()?;
        let key = CacheKey::Category(name.to_owned());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for category");
            return Ok(products);
        }

        let payload = self
            .get(&format!("/products/category/{}", segment(name)))
            .await?;
        let products = Arc::new(products_from(payload)?);

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Search the catalog. An empty query returns no products without a
    /// request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the response has no products.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ApiError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let payload = self.get(&query.path()).await?;
        let mut products = products_from(payload)?;
        products.retain(|product| query.admits(product));

        debug!(count = products.len(), "Search finished");
        Ok(products)
    }

    /// Drop every cached catalog response.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Cached responses are only served while the session is valid.
    fn require_session(&self) -> Result<(), ApiError> {
        self.inner.gateway.session().ensure_valid()?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Payload, ApiError> {
        self.inner
            .gateway
            .authorized_request(Method::Get, path, None)
            .await
    }
}

/// Decode a product image body into raw bytes.
///
/// Accepts bare base64 and `data:` URLs.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the data is not base64.
pub fn decode_image(data: &str) -> Result<Vec<u8>, ApiError> {
    let data = data.trim();
    let encoded = data
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .map_or(data, |(_, encoded)| encoded);

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::Decode(format!("image is not base64: {e}")))
}

/// Products from either a bare list or a `{content: [...]}` page.
fn products_from(payload: Payload) -> Result<Vec<Product>, ApiError> {
    match payload {
        Payload::Empty => Ok(Vec::new()),
        Payload::Array(items) => Payload::Array(items).decode(),
        Payload::Object(map) if matches!(map.get("content"), Some(Value::Array(_))) => {
            Ok(Payload::Object(map).decode::<ProductPage>()?.content)
        }
        _ => Err(ApiError::Decode("expected a product list".to_owned())),
    }
}

/// Percent-encode a single path segment.
fn segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
