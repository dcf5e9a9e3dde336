//! Integration tests for Plateful.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no database needed)
//! cargo test -p plateful-integration-tests
//!
//! # Live tests against running binaries and a migrated database
//! STOREFRONT_URL=http://localhost:3000 cargo test -p plateful-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart engine and checkout snapshot
//! - `admin_board` - Board session, transitions and the realtime adapter
//! - `admin_push` - Device routes, client setup over HTTP, fan-out and sweep
//! - `storefront_live` - Storefront API against a running server (ignored)

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

pub mod fakes;
pub mod fixtures;
