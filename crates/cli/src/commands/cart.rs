//! Cart commands.
//!
//! Each invocation starts with an empty snapshot, so every command that
//! depends on cart contents reloads it first.

use std::num::NonZeroU32;

use sdcart_client::AppContext;
use sdcart_core::{CartItem, CartItemId, Price, ProductId};

use super::CliError;

/// Print the cart.
///
/// # Errors
///
/// Returns an error if there is no valid session.
pub async fn show(context: &AppContext) -> Result<(), CliError> {
    load(context).await?;
    print_cart(&context.cart().snapshot());
    Ok(())
}

/// Add a product.
///
/// # Errors
///
/// Returns an error if the session is invalid or the server rejects the add.
pub async fn add(
    context: &AppContext,
    product_id: String,
    quantity: NonZeroU32,
) -> Result<(), CliError> {
    let item = context
        .cart()
        .try_add(ProductId::from(product_id), quantity)
        .await?;

    println!(
        "Added {} x{} (entry {}, {})",
        display_name(&item),
        item.quantity,
        item.id,
        rupees(&item)
    );
    Ok(())
}

/// Remove entries one by one.
///
/// # Errors
///
/// Returns an error if there is no valid session. Individual removal
/// failures are reported, not returned.
pub async fn remove(context: &AppContext, ids: &[i64]) -> Result<(), CliError> {
    load(context).await?;

    let ids: Vec<CartItemId> = ids.iter().copied().map(CartItemId::from).collect();
    let outcome = context.cart().remove_many(&ids).await;

    for id in &outcome.removed {
        println!("Removed entry {id}");
    }
    for id in &outcome.skipped {
        println!("Entry {id} is not in the cart");
    }
    for id in &outcome.failed {
        println!("Failed to remove entry {id}");
    }
    println!(
        "Cart: {} item(s), total ₹{}",
        context.cart().count(),
        context.cart().total().display()
    );
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session is invalid or the server refuses.
pub async fn clear(context: &AppContext) -> Result<(), CliError> {
    context.cart().try_clear().await?;
    println!("Cart cleared");
    Ok(())
}

/// Place the order.
///
/// # Errors
///
/// Returns an error if the session is invalid or the cart cannot be cleared.
pub async fn checkout(context: &AppContext) -> Result<(), CliError> {
    load(context).await?;

    if context.cart().count() == 0 {
        println!("Your cart is empty");
        return Ok(());
    }

    let total = context.cart().checkout().await?;
    println!("Order placed. Thank you for your order!");
    println!("Total: ₹{}", total.display());
    Ok(())
}

/// Check the session, then reload the cart.
async fn load(context: &AppContext) -> Result<(), CliError> {
    // Reload downgrades every failure to an empty cart; surface a missing
    // session instead of printing an empty cart.
    context.session().ensure_valid()?;
    context.cart().reload().await;
    Ok(())
}

fn print_cart(items: &[CartItem]) {
    if items.is_empty() {
        println!("Your cart is empty");
        return;
    }

    println!(
        "{:>6}  {:<10}  {:<32}  {:>4}  {:>10}",
        "ENTRY", "PRODUCT", "NAME", "QTY", "PRICE"
    );
    for item in items {
        println!(
            "{:>6}  {:<10}  {:<32}  {:>4}  {:>10}",
            item.id,
            item.product_id,
            display_name(item),
            item.quantity,
            rupees(item)
        );
    }

    let total: Price = items.iter().map(|item| item.price).sum();
    println!("Items: {}    Total: ₹{}", items.len(), total.display());
}

fn display_name(item: &CartItem) -> &str {
    if item.name.trim().is_empty() {
        "(unnamed)"
    } else {
        &item.name
    }
}

fn rupees(item: &CartItem) -> String {
    format!("₹{}", item.price.display())
}
