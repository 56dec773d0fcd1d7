//! Catalog commands.

use std::path::Path;

use sdcart_client::AppContext;
use sdcart_client::catalog::{SearchQuery, decode_image};
use sdcart_core::{Product, ProductId};

use super::CliError;

/// List every product.
///
/// # Errors
///
/// Returns an error if there is no valid session or the request fails.
pub async fn list(context: &AppContext) -> Result<(), CliError> {
    let products = context.catalog().list_products().await?;
    if products.is_empty() {
        println!("No products");
        return Ok(());
    }

    for product in products.iter() {
        println!(
            "{:<10}  {:<40}  ₹{:>10}",
            product.id,
            product.name,
            product.price.display()
        );
    }
    Ok(())
}

/// Show one product.
///
/// # Errors
///
/// Returns an error if there is no valid session or the product cannot be loaded.
pub async fn show(context: &AppContext, id: String) -> Result<(), CliError> {
    let product = context.catalog().product(&ProductId::from(id)).await?;

    println!("{} ({})", product.name, product.id);
    println!("Price:    ₹{}", product.price.display());
    if let Some(brand) = &product.brand {
        println!("Brand:    {brand}");
    }
    if let Some(category) = &product.category {
        println!("Category: {category}");
    }
    if let Some(stock) = product.stock {
        println!("Stock:    {stock}");
    }
    if product.has_absolute_image()
        && let Some(url) = &product.image_url
    {
        println!("Image:    {url}");
    }
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

/// Decode a product's image and write it to `out`.
///
/// # Errors
///
/// Returns an error if the image cannot be fetched or decoded, or the file
/// cannot be written.
pub async fn image(context: &AppContext, id: String, out: &Path) -> Result<(), CliError> {
    let encoded = context.catalog().product_image(&ProductId::from(id)).await?;
    let bytes = decode_image(&encoded)?;

    std::fs::write(out, &bytes).map_err(|source| CliError::Output {
        path: out.to_path_buf(),
        source,
    })?;

    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

/// List the products in one category.
///
/// # Errors
///
/// Returns an error if there is no valid session or the request fails.
pub async fn category(context: &AppContext, name: &str) -> Result<(), CliError> {
    let products = context.catalog().category(name).await?;
    print_products(&products);
    Ok(())
}

/// Search the catalog.
///
/// # Errors
///
/// Returns an error if there is no valid session or the request fails.
pub async fn search(context: &AppContext, query: &SearchQuery) -> Result<(), CliError> {
    if query.is_empty() {
        println!("Give at least one of --query, --brand, --category, --min-price or --max-price");
        return Ok(());
    }

    let products = context.catalog().search(query).await?;
    print_products(&products);
    Ok(())
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }

    for product in products {
        println!(
            "{:<10}  {:<32}  {:<16}  ₹{:>10}",
            product.id,
            product.name,
            product.brand.as_deref().unwrap_or("-"),
            product.price.display()
        );
    }
    println!("{} product(s)", products.len());
}
