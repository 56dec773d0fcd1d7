//! Core types for SDCart.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod address;
pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod user;

pub use address::{Address, AddressInput};
pub use cart::CartItem;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use product::{Product, ProductPage, ProductSummary};
pub use user::{Claims, UserProfile};
