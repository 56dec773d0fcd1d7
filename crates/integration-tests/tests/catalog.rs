//! Catalog reads, caching and the address book.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use sdcart_client::address::AddressError;
use sdcart_client::auth::SessionError;
use sdcart_client::catalog::{SearchQuery, decode_image};
use sdcart_client::gateway::ApiError;
use sdcart_core::{AddressId, AddressInput, Price, ProductId};
use sdcart_integration_tests::{EMAIL, MockBackend, make_jwt};

fn address_input() -> AddressInput {
    AddressInput {
        full_name: "Asha Rao".to_owned(),
        mobile_number: "9876543210".to_owned(),
        address_line1: "12 MG Road".to_owned(),
        city: "Bengaluru".to_owned(),
        state: "Karnataka".to_owned(),
        pincode: "560001".to_owned(),
        ..AddressInput::default()
    }
}

#[tokio::test]
async fn test_product_listing_is_cached() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let first = context.catalog().list_products().await.unwrap();
    let second = context.catalog().list_products().await.unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert_eq!(backend.requests_to("GET", "/products/light").len(), 1);
}

#[tokio::test]
async fn test_logout_drops_cached_catalog() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;
    context.catalog().product(&ProductId::from("A")).await.unwrap();

    context.logout();
    assert!(context.catalog().product(&ProductId::from("A")).await.is_err());
    assert_eq!(backend.requests_to("GET", "/products/product/A").len(), 1);
}

#[tokio::test]
async fn test_product_details() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let product = context.catalog().product(&ProductId::from("C")).await.unwrap();

    assert_eq!(product.name, "Desk Lamp");
    assert_eq!(product.brand.as_deref(), Some("Syska"));
    assert_eq!(product.price, Price::from_units(2500));
    assert!(product.has_absolute_image());
}

#[tokio::test]
async fn test_unknown_product_is_an_error() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let err = context
        .catalog()
        .product(&ProductId::from("nope"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_product_image_decodes() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let image = context
        .catalog()
        .product_image(&ProductId::from("A"))
        .await
        .unwrap();

    assert_eq!(decode_image(&image).unwrap(), b"PNG");
}

#[tokio::test]
async fn test_category_listing() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let kitchen = context.catalog().category("kitchen").await.unwrap();

    let names: Vec<_> = kitchen.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Electric Kettle", "Toaster", "Hand Blender"]);
}

#[tokio::test]
async fn test_search_applies_price_bounds_locally() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let query = SearchQuery {
        category: Some("kitchen".to_owned()),
        min_price: Some(Price::from_units(100)),
        max_price: Some(Price::from_units(1800)),
        ..SearchQuery::default()
    };
    let results = context.catalog().search(&query).await.unwrap();

    let ids: Vec<_> = results.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "D"]);
}

#[tokio::test]
async fn test_search_by_brand() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let query = SearchQuery {
        brand: Some("Philips".to_owned()),
        ..SearchQuery::default()
    };
    let results = context.catalog().search(&query).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|p| p.brand.as_deref() == Some("Philips")));
}

#[tokio::test]
async fn test_empty_search_sends_nothing() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let results = context
        .catalog()
        .search(&SearchQuery::default())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert!(backend.requests_to("GET", "/products/search").is_empty());
}

#[tokio::test]
async fn test_current_address_from_list_takes_first() {
    let backend = MockBackend::start().await;
    backend.state().address = json!([
        { "id": 4, "fullName": "Asha Rao", "city": "Bengaluru" },
        { "id": 5, "fullName": "Ravi Rao", "city": "Mysuru" },
    ]);
    let context = backend.signed_in().await;

    let address = context.addresses().current().await.unwrap().unwrap();

    assert_eq!(address.id, AddressId::new(4));
    assert_eq!(address.fields.city, "Bengaluru");
}

#[tokio::test]
async fn test_current_address_from_object() {
    let backend = MockBackend::start().await;
    backend.state().address = json!({ "id": 9, "fullName": "Asha Rao", "pincode": "560001" });
    let context = backend.signed_in().await;

    let address = context.addresses().current().await.unwrap().unwrap();

    assert_eq!(address.id, AddressId::new(9));
    assert_eq!(address.fields.pincode, "560001");
}

#[tokio::test]
async fn test_no_saved_address() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    assert!(context.addresses().current().await.unwrap().is_none());
}

#[tokio::test]
async fn test_address_add_update_delete() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;
    let book = context.addresses();

    book.add(&address_input()).await.unwrap();
    let saved = book.current().await.unwrap().unwrap();
    assert_eq!(saved.fields.full_name, "Asha Rao");

    let mut changed = address_input();
    changed.city = "Mysuru".to_owned();
    book.update(saved.id, &changed).await.unwrap();
    assert_eq!(backend.requests_to("PUT", "/api/address/1").len(), 1);
    assert_eq!(book.current().await.unwrap().unwrap().fields.city, "Mysuru");

    book.delete(saved.id).await.unwrap();
    assert!(book.current().await.unwrap().is_none());
}

#[tokio::test]
async fn test_incomplete_address_is_not_sent() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;

    let mut input = address_input();
    input.pincode = "  ".to_owned();
    let err = context.addresses().add(&input).await.unwrap_err();

    assert!(matches!(err, AddressError::MissingField("pincode")));
    assert!(backend.requests_to("POST", "/api/address/add").is_empty());
}

#[tokio::test]
async fn test_cached_listing_needs_live_session() {
    let backend = MockBackend::start().await;
    let context = backend.signed_in().await;
    context.catalog().list_products().await.unwrap();

    context
        .session()
        .tokens()
        .save(&make_jwt(EMAIL, 1), Some(1))
        .unwrap();
    let err = context.catalog().list_products().await.unwrap_err();

    assert!(matches!(err, ApiError::Session(SessionError::Expired)));
    assert!(err.requires_login());
    assert_eq!(backend.requests_to("GET", "/products/light").len(), 1);
}
