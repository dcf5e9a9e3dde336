//! Session keys.

/// Keys for values stored in the customer session.
pub mod keys {
    /// Persisted cart: `{lines, boundRestaurantId}`.
    pub const CART: &str = "cart";
}
