//! Response and session models for the storefront.

pub mod menu;
pub mod session;

pub use menu::{CartView, MenuSection, MenuView};
