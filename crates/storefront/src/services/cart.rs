//! Session-backed cart store.
//!
//! The cart is kept in the customer's session under [`keys::CART`] in its
//! persisted form (`{lines, boundRestaurantId}`). A [`CartStore`] loads it
//! lazily on first use, applies changes in memory and writes the new
//! persisted form back only when something changed.
//!
//! A stored record that fails validation is logged and discarded, and the
//! customer starts over with an empty cart.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use tower_sessions::Session;

use plateful_core::cart::{Cart, PersistedCart};

use crate::models::session::keys;

/// Errors from the session backing store.
#[derive(Debug, thiserror::Error)]
pub enum CartStoreError {
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Whether the cart has been loaded from the session yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CartHydration {
    #[default]
    Uninitialized,
    Ready(Cart),
}

impl CartHydration {
    /// The single transition, `Uninitialized -> Ready`.
    ///
    /// Restores from `stored` if present and valid. A cart that is already
    /// ready is returned unchanged and `stored` is ignored.
    #[must_use]
    pub fn hydrate(self, stored: Option<serde_json::Value>) -> Self {
        match self {
            Self::Uninitialized => Self::Ready(restore(stored)),
            ready @ Self::Ready(_) => ready,
        }
    }

    /// Whether the cart is loaded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The loaded cart, if any.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Ready(cart) => Some(cart),
            Self::Uninitialized => None,
        }
    }

    /// Consume into the loaded cart, if any.
    #[must_use]
    pub fn into_cart(self) -> Option<Cart> {
        match self {
            Self::Ready(cart) => Some(cart),
            Self::Uninitialized => None,
        }
    }
}

fn restore(stored: Option<serde_json::Value>) -> Cart {
    let Some(value) = stored else {
        return Cart::new();
    };

    let persisted = match serde_json::from_value::<PersistedCart>(value) {
        Ok(persisted) => persisted,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding undecodable stored cart");
            return Cart::new();
        }
    };

    Cart::restore(persisted).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding invalid stored cart");
        Cart::new()
    })
}

/// Per-request handle on the session cart.
pub struct CartStore {
    session: Session,
    state: CartHydration,
}

impl CartStore {
    /// Wrap a session. Nothing is read until the cart is first used.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            session,
            state: CartHydration::Uninitialized,
        }
    }

    async fn load(&mut self) -> Result<Cart, CartStoreError> {
        let mut state = std::mem::take(&mut self.state);
        if !state.is_ready() {
            let stored = self.session.get::<serde_json::Value>(keys::CART).await?;
            let was_present = stored.is_some();
            state = state.hydrate(stored);
            if was_present && state.cart().is_some_and(Cart::is_empty) {
                // Drop whatever was rejected so it is not re-read.
                self.session.remove_value(keys::CART).await?;
            }
        }
        Ok(state.into_cart().unwrap_or_default())
    }

    /// Current cart contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn snapshot(&mut self) -> Result<Cart, CartStoreError> {
        let cart = self.load().await?;
        self.state = CartHydration::Ready(cart.clone());
        Ok(cart)
    }

    /// Apply `f` to the cart and persist the result if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read or written.
    pub async fn mutate<T>(&mut self, f: impl FnOnce(&mut Cart) -> T) -> Result<T, CartStoreError> {
        let mut cart = self.load().await?;
        let before = cart.clone();
        let out = f(&mut cart);

        let changed = cart != before;
        let persisted = cart.to_persisted();
        let is_empty = cart.is_empty();
        self.state = CartHydration::Ready(cart);

        if changed {
            if is_empty {
                self.session.remove_value(keys::CART).await?;
            } else {
                self.session.insert(keys::CART, persisted).await?;
            }
        }
        Ok(out)
    }
}

impl<S> FromRequestParts<S> for CartStore
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "session layer missing"))?;
        Ok(Self::new(session))
    }
}
