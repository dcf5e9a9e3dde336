//! Checkout: validate the cart and customer details into an order draft.

use plateful_core::cart::{Cart, CartTotals};
use plateful_core::order::{CustomerForm, CustomerInfo, FieldError, OrderLine};
use plateful_core::{OrderId, RestaurantId};

use crate::error::AppError;
use crate::services::cart::CartStore;

/// Everything needed to insert a new order.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: OrderId,
    pub restaurant_id: RestaurantId,
    pub lines: Vec<OrderLine>,
    pub customer: CustomerInfo,
    pub totals: CartTotals,
}

/// Reasons checkout cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("invalid customer details")]
    InvalidCustomer(Vec<FieldError>),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::BadRequest("Your cart is empty".to_string()),
            CheckoutError::InvalidCustomer(fields) => Self::Validation(fields),
        }
    }
}

/// Build an order draft from the cart and the submitted form.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] for an empty cart, otherwise
/// [`CheckoutError::InvalidCustomer`] listing every invalid field.
pub fn prepare_order(cart: &Cart, form: CustomerForm) -> Result<OrderDraft, CheckoutError> {
    let Some(restaurant_id) = cart.bound_restaurant().cloned() else {
        return Err(CheckoutError::EmptyCart);
    };
    let customer = form.validate().map_err(CheckoutError::InvalidCustomer)?;

    Ok(OrderDraft {
        id: OrderId::generate(),
        restaurant_id,
        lines: cart.to_order_lines(),
        customer,
        totals: cart.totals(),
    })
}

/// Empty the session cart once its order is stored.
///
/// The order already exists at this point, so a session failure is logged
/// and captured instead of failing the request. Returns whether the cart
/// was cleared.
pub async fn clear_after_checkout(store: &mut CartStore, order_id: &OrderId) -> bool {
    match store.mutate(Cart::clear).await {
        Ok(()) => true,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                order_id = %order_id,
                error = %e,
                sentry_event_id = %event_id,
                "Order placed but cart could not be cleared"
            );
            false
        }
    }
}
