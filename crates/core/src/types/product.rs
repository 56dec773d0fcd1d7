//! Catalog product types.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Lightweight product listing entry (`GET /products/light`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Price,
}

/// Full product details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

/// One page of search results.
///
/// The search endpoint wraps its products in a paginated envelope whose only
/// reliably present field is `content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPage {
    pub content: Vec<Product>,
    pub total_elements: Option<u64>,
    pub total_pages: Option<u32>,
    pub number: Option<u32>,
}

impl Product {
    /// Whether the image URL is a full URL rather than a bare asset id.
    #[must_use]
    pub fn has_absolute_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| url.starts_with("http://") || url.starts_with("https://"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_missing_fields_default() {
        let page: ProductPage = serde_json::from_value(serde_json::json!({
            "content": [{ "id": 1, "name": "Lamp", "price": 12.5 }]
        }))
        .unwrap();

        assert_eq!(page.content.len(), 1);
        assert!(page.total_pages.is_none());
        assert_eq!(page.content[0].id, ProductId::from(1));
    }

    #[test]
    fn test_absolute_image_detection() {
        let mut product: Product =
            serde_json::from_value(serde_json::json!({ "id": "p1", "imageUrl": "abc123" }))
                .unwrap();
        assert!(!product.has_absolute_image());

        product.image_url = Some("https://cdn.example/p1.png".to_string());
        assert!(product.has_absolute_image());
    }
}
