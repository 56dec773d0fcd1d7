//! SDCart client library.
//!
//! Keeps a signed-in user's session and shopping cart in sync with the
//! SDCart backend, and exposes the catalog and address endpoints the cart
//! flow depends on.
//!
//! # Components
//!
//! - [`auth`] - credential storage, session validation, sign-in
//! - [`gateway`] - the single HTTP boundary
//! - [`cart`] - the server-synchronized cart snapshot
//! - [`catalog`] - cached product reads and search
//! - [`address`] - the saved delivery address
//! - [`context`] - wires all of the above together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod storage;
pub mod telemetry;

pub use context::AppContext;
pub use error::{ClientError, Result};
