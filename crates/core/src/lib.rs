//! Plateful Core - Shared domain library.
//!
//! This crate provides the types and pure state machines used across all
//! Plateful components:
//! - `storefront` - Customer-facing menu, cart and checkout
//! - `admin` - Restaurant dashboard, order board and push notifications
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure logic - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere, including tests that never touch a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails and statuses
//! - [`cart`] - Single-restaurant cart engine with totals computation
//! - [`order`] - Order snapshot model and boundary validation
//! - [`menu`] - Restaurants, categories and menu items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod menu;
pub mod order;
pub mod types;

pub use types::*;

#[doc(hidden)]
pub mod __private {
    pub use uuid::Uuid;
}
