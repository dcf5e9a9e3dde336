//! Business logic services for admin.
//!
//! # Services
//!
//! - `orders` - Validated, race-checked order status transitions

pub mod orders;

pub use orders::{
    OrderStore, PgOrderStore, TransitionFailure, TransitionRequest, apply_transition,
};
