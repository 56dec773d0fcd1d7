//! SDCart Core - Shared types library.
//!
//! This crate provides the domain types used by every SDCart component:
//! - `client` - Session, cart, catalog and address clients for the REST API
//! - `cli` - Command-line front end built on the client
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, emails, cart items, products, addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
