//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Session-backed cart store with explicit hydration state
//! - `checkout` - Turn the session cart into a placed order

pub mod cart;
pub mod checkout;
