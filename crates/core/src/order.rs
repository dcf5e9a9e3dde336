//! Placed orders.
//!
//! An [`Order`] is created once at checkout from a cart snapshot. Its lines
//! are copied from the cart and never change afterwards, so historic orders
//! stay stable when the live menu is edited. Only the status moves.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartTotals;
use crate::types::{Email, MenuItemId, Money, OrderId, OrderStatus, RestaurantId};

/// Minutes a pending order may wait before it is flagged urgent.
pub const URGENT_AFTER_MINUTES: i64 = 30;

/// One immutable line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: MenuItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_subtotal: Money,
}

/// Contact and delivery details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Raw checkout form as submitted by the customer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single invalid form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl CustomerForm {
    /// Validate the form into [`CustomerInfo`].
    ///
    /// Every field is checked so the caller can report all problems at once.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per invalid field.
    pub fn validate(self) -> Result<CustomerInfo, Vec<FieldError>> {
        let mut errors = Vec::new();

        let mut required = |field: &'static str, value: String| {
            let value = value.trim().to_owned();
            if value.is_empty() {
                errors.push(FieldError {
                    field,
                    message: format!("{field} is required"),
                });
            }
            value
        };
        let name = required("name", self.name);
        let phone = required("phone", self.phone);
        let address = required("address", self.address);

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(FieldError {
                    field: "email",
                    message: e.to_string(),
                });
                None
            }
        };

        let notes = self
            .notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());

        match email {
            Some(email) if errors.is_empty() => Ok(CustomerInfo {
                name,
                email,
                phone,
                address,
                notes,
            }),
            _ => Err(errors),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub restaurant_id: RestaurantId,
    pub lines: Vec<OrderLine>,
    pub customer: CustomerInfo,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Whether the order has been pending for longer than
    /// [`URGENT_AFTER_MINUTES`] at `now`.
    #[must_use]
    pub fn is_urgent(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Pending
            && now.signed_duration_since(self.created_at) > TimeDelta::minutes(URGENT_AFTER_MINUTES)
    }

    /// Check that the stored amounts agree with the line snapshot.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderDecodeError`] naming the first inconsistency.
    pub fn validate(&self) -> Result<(), OrderDecodeError> {
        if self.lines.is_empty() {
            return Err(OrderDecodeError::NoLines);
        }
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderDecodeError::ZeroQuantity {
                    item_id: line.item_id.clone(),
                });
            }
            if line.unit_price * line.quantity != line.line_subtotal {
                return Err(OrderDecodeError::LineSubtotalMismatch {
                    item_id: line.item_id.clone(),
                });
            }
        }
        let expected = CartTotals::from_subtotal(self.lines.iter().map(|l| l.line_subtotal).sum());
        if expected.subtotal != self.subtotal || expected.tax != self.tax || expected.total != self.total
        {
            return Err(OrderDecodeError::TotalsMismatch);
        }
        Ok(())
    }
}

/// Reasons a stored order record is rejected.
#[derive(Debug, thiserror::Error)]
pub enum OrderDecodeError {
    #[error("invalid id: {0}")]
    Id(#[from] crate::types::IdError),
    #[error("malformed {field}: {source}")]
    Json {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("order has no lines")]
    NoLines,
    #[error("line {item_id} has zero quantity")]
    ZeroQuantity { item_id: MenuItemId },
    #[error("line {item_id} subtotal does not match price × quantity")]
    LineSubtotalMismatch { item_id: MenuItemId },
    #[error("order totals do not match its lines")]
    TotalsMismatch,
}

#[cfg(feature = "postgres")]
pub use row::OrderRow;

#[cfg(feature = "postgres")]
mod row {
    use chrono::{DateTime, Utc};
    use sqlx::types::Json;

    use super::{Order, OrderDecodeError};
    use crate::types::{Money, OrderId, OrderStatus, RestaurantId};

    /// Raw `orders` row, validated into an [`Order`] with `TryFrom`.
    #[derive(Debug, sqlx::FromRow)]
    pub struct OrderRow {
        pub id: String,
        pub restaurant_id: String,
        pub lines: Json<serde_json::Value>,
        pub customer: Json<serde_json::Value>,
        pub status: OrderStatus,
        pub subtotal: Money,
        pub tax: Money,
        pub total: Money,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl TryFrom<OrderRow> for Order {
        type Error = OrderDecodeError;

        fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
            let lines = serde_json::from_value(row.lines.0).map_err(|source| {
                OrderDecodeError::Json {
                    field: "lines",
                    source,
                }
            })?;
            let customer = serde_json::from_value(row.customer.0).map_err(|source| {
                OrderDecodeError::Json {
                    field: "customer",
                    source,
                }
            })?;

            let order = Self {
                id: OrderId::try_from(row.id)?,
                restaurant_id: RestaurantId::try_from(row.restaurant_id)?,
                lines,
                customer,
                status: row.status,
                subtotal: row.subtotal,
                tax: row.tax,
                total: row.total,
                created_at: row.created_at,
                updated_at: row.updated_at,
            };
            order.validate()?;
            Ok(order)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cart::{Cart, CartItem};

    fn sample_order(status: OrderStatus, created_at: DateTime<Utc>) -> Order {
        let mut cart = Cart::new();
        cart.add_item(
            &CartItem {
                item_id: MenuItemId::parse("a").unwrap(),
                restaurant_id: RestaurantId::parse("r1").unwrap(),
                name: "Pad Thai".into(),
                unit_price: Money::from_cents(1000),
            },
            2,
        )
        .unwrap();
        let totals = cart.totals();
        Order {
            id: OrderId::parse("order-1").unwrap(),
            restaurant_id: RestaurantId::parse("r1").unwrap(),
            lines: cart.to_order_lines(),
            customer: CustomerInfo {
                name: "Sam".into(),
                email: Email::parse("sam@example.com").unwrap(),
                phone: "555-0100".into(),
                address: "1 Main St".into(),
                notes: None,
            },
            status,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_urgent_after_thirty_minutes_pending() {
        let now = Utc::now();
        let old = sample_order(OrderStatus::Pending, now - TimeDelta::minutes(31));
        let fresh = sample_order(OrderStatus::Pending, now - TimeDelta::minutes(29));
        assert!(old.is_urgent(now));
        assert!(!fresh.is_urgent(now));
    }

    #[test]
    fn test_only_pending_orders_are_urgent() {
        let now = Utc::now();
        let order = sample_order(OrderStatus::Preparing, now - TimeDelta::hours(3));
        assert!(!order.is_urgent(now));
    }

    #[test]
    fn test_validate_accepts_consistent_snapshot() {
        let order = sample_order(OrderStatus::Pending, Utc::now());
        assert!(order.validate().is_ok());
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn test_validate_rejects_tampered_totals() {
        let mut order = sample_order(OrderStatus::Pending, Utc::now());
        order.total = Money::from_cents(1);
        assert!(matches!(
            order.validate(),
            Err(OrderDecodeError::TotalsMismatch)
        ));
    }

    #[test]
    fn test_validate_rejects_bad_line_subtotal() {
        let mut order = sample_order(OrderStatus::Pending, Utc::now());
        order.lines[0].line_subtotal = Money::from_cents(999);
        assert!(matches!(
            order.validate(),
            Err(OrderDecodeError::LineSubtotalMismatch { .. })
        ));
    }

    #[test]
    fn test_customer_form_reports_every_field() {
        let errors = CustomerForm::default().validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "phone", "address", "email"]);
    }

    #[test]
    fn test_customer_form_trims_and_drops_empty_notes() {
        let info = CustomerForm {
            name: "  Sam ".into(),
            email: "sam@example.com".into(),
            phone: "555".into(),
            address: "1 Main St".into(),
            notes: Some("   ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(info.name, "Sam");
        assert_eq!(info.notes, None);
    }

    #[test]
    fn test_order_json_shape() {
        let order = sample_order(OrderStatus::Ready, Utc::now());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["restaurantId"], "r1");
        assert_eq!(json["lines"][0]["lineSubtotal"], "20.00");
    }
}
