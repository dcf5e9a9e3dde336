//! Single-restaurant cart engine.
//!
//! A [`Cart`] holds one in-progress order draft. Every line belongs to the
//! same restaurant (the *bound* restaurant); the binding is set by the first
//! add and released when the last line is removed. Adding an item from any
//! other restaurant is rejected without touching the cart so the caller can
//! ask the customer to clear it first.
//!
//! Totals are recomputed after every mutation and never persisted: the
//! durable form ([`PersistedCart`]) carries only the lines and the binding.

use serde::{Deserialize, Serialize};

use crate::order::OrderLine;
use crate::types::{MenuItemId, Money, RestaurantId};

/// Most units a single line may hold. Larger requests are clamped.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// A menu item as offered to the cart.
///
/// Callers build this from the live menu so that name and price are never
/// taken from client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    /// Menu item id.
    pub item_id: MenuItemId,
    /// Restaurant that sells the item.
    pub restaurant_id: RestaurantId,
    /// Display name at the time of adding.
    pub name: String,
    /// Unit price at the time of adding.
    pub unit_price: Money,
}

/// One (item, quantity) pairing in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    item_id: MenuItemId,
    restaurant_id: RestaurantId,
    name: String,
    unit_price: Money,
    quantity: u32,
    line_subtotal: Money,
}

impl CartLine {
    fn new(item: &CartItem, quantity: u32) -> Self {
        let mut line = Self {
            item_id: item.item_id.clone(),
            restaurant_id: item.restaurant_id.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity,
            line_subtotal: Money::ZERO,
        };
        line.set_quantity(quantity);
        line
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_subtotal = self.unit_price * quantity;
    }

    /// Menu item id.
    #[must_use]
    pub const fn item_id(&self) -> &MenuItemId {
        &self.item_id
    }

    /// Restaurant the item belongs to.
    #[must_use]
    pub const fn restaurant_id(&self) -> &RestaurantId {
        &self.restaurant_id
    }

    /// Item name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit price.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Quantity ordered.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub const fn line_subtotal(&self) -> Money {
        self.line_subtotal
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of all line subtotals.
    pub subtotal: Money,
    /// Tax on the subtotal.
    pub tax: Money,
    /// Subtotal plus tax.
    pub total: Money,
}

impl CartTotals {
    /// Compute tax and total from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = subtotal.tax();
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// Rejections produced by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The item belongs to a different restaurant than the cart.
    #[error("cart already holds items from restaurant {bound}; clear it before adding from {attempted}")]
    DifferentRestaurant {
        /// Restaurant the cart is bound to.
        bound: RestaurantId,
        /// Restaurant of the rejected item.
        attempted: RestaurantId,
    },
}

/// The draft order for one browsing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    bound_restaurant: Option<RestaurantId>,
    totals: CartTotals,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Restaurant the cart is bound to, if any.
    #[must_use]
    pub const fn bound_restaurant(&self) -> Option<&RestaurantId> {
        self.bound_restaurant.as_ref()
    }

    /// Current totals.
    #[must_use]
    pub const fn totals(&self) -> CartTotals {
        self.totals
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Find the line for an item.
    #[must_use]
    pub fn line(&self, item_id: &MenuItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.item_id == item_id)
    }

    /// Add `quantity` units of `item`.
    ///
    /// An empty cart binds to the item's restaurant. Adding to an existing
    /// line accumulates its quantity; otherwise a new line is appended.
    /// A quantity of zero leaves the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DifferentRestaurant`] if the cart is bound to a
    /// different restaurant. The cart is not modified in that case.
    pub fn add_item(&mut self, item: &CartItem, quantity: u32) -> Result<(), CartError> {
        if let Some(bound) = &self.bound_restaurant
            && bound != &item.restaurant_id
        {
            return Err(CartError::DifferentRestaurant {
                bound: bound.clone(),
                attempted: item.restaurant_id.clone(),
            });
        }

        if quantity == 0 {
            return Ok(());
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.item_id == item.item_id)
        {
            let quantity = line.quantity.saturating_add(quantity);
            line.set_quantity(quantity.min(MAX_LINE_QUANTITY));
        } else {
            self.lines
                .push(CartLine::new(item, quantity.min(MAX_LINE_QUANTITY)));
        }

        self.bound_restaurant = Some(item.restaurant_id.clone());
        self.recalculate();
        Ok(())
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity of zero or less removes the line; anything above
    /// [`MAX_LINE_QUANTITY`] is clamped to it. Unknown items are ignored.
    pub fn update_quantity(&mut self, item_id: &MenuItemId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(item_id);
            return;
        }
        let quantity = u32::try_from(quantity)
            .map_or(MAX_LINE_QUANTITY, |q| q.min(MAX_LINE_QUANTITY));
        self.set_line_quantity(item_id, quantity);
    }

    fn set_line_quantity(&mut self, item_id: &MenuItemId, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|line| &line.item_id == item_id) {
            line.set_quantity(quantity);
            self.recalculate();
        }
    }

    /// Remove the line for an item. Returns whether a line was removed.
    ///
    /// Removing the last line releases the restaurant binding.
    pub fn remove_item(&mut self, item_id: &MenuItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.item_id != item_id);
        let removed = self.lines.len() != before;
        if self.lines.is_empty() {
            self.bound_restaurant = None;
        }
        self.recalculate();
        removed
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.bound_restaurant = None;
        self.totals = CartTotals::default();
    }

    /// Compute totals from the current lines.
    #[must_use]
    pub fn calculate_totals(&self) -> CartTotals {
        CartTotals::from_subtotal(self.lines.iter().map(CartLine::line_subtotal).sum())
    }

    fn recalculate(&mut self) {
        self.totals = self.calculate_totals();
    }

    /// Snapshot the lines for an order.
    #[must_use]
    pub fn to_order_lines(&self) -> Vec<OrderLine> {
        self.lines
            .iter()
            .map(|line| OrderLine {
                item_id: line.item_id.clone(),
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_subtotal: line.line_subtotal,
            })
            .collect()
    }

    /// Durable form of the cart (lines and binding only).
    #[must_use]
    pub fn to_persisted(&self) -> PersistedCart {
        PersistedCart {
            lines: self
                .lines
                .iter()
                .map(|line| PersistedLine {
                    item_id: line.item_id.clone(),
                    restaurant_id: line.restaurant_id.clone(),
                    name: line.name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                })
                .collect(),
            bound_restaurant_id: self.bound_restaurant.clone(),
        }
    }

    /// Rebuild a cart from its durable form, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`CartRestoreError`] describing the first violated
    /// invariant. Nothing is defaulted or silently repaired.
    pub fn restore(persisted: PersistedCart) -> Result<Self, CartRestoreError> {
        let PersistedCart {
            lines,
            bound_restaurant_id,
        } = persisted;

        let bound = match (&bound_restaurant_id, lines.is_empty()) {
            (None, true) => return Ok(Self::new()),
            (Some(_), true) => return Err(CartRestoreError::BoundWithoutLines),
            (None, false) => return Err(CartRestoreError::LinesWithoutBinding),
            (Some(bound), false) => bound.clone(),
        };

        let mut cart = Self::new();
        for line in lines {
            if line.restaurant_id != bound {
                return Err(CartRestoreError::MixedRestaurants {
                    item_id: line.item_id,
                });
            }
            if line.quantity == 0 {
                return Err(CartRestoreError::ZeroQuantity {
                    item_id: line.item_id,
                });
            }
            if line.quantity > MAX_LINE_QUANTITY {
                return Err(CartRestoreError::QuantityTooLarge {
                    item_id: line.item_id,
                });
            }
            if line.unit_price.is_negative() {
                return Err(CartRestoreError::NegativePrice {
                    item_id: line.item_id,
                });
            }
            if cart.line(&line.item_id).is_some() {
                return Err(CartRestoreError::DuplicateItem {
                    item_id: line.item_id,
                });
            }
            let item = CartItem {
                item_id: line.item_id,
                restaurant_id: line.restaurant_id,
                name: line.name,
                unit_price: line.unit_price,
            };
            cart.lines.push(CartLine::new(&item, line.quantity));
        }

        cart.bound_restaurant = Some(bound);
        cart.recalculate();
        Ok(cart)
    }
}

/// Durable cart record: `{lines, boundRestaurantId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCart {
    /// Lines in insertion order.
    pub lines: Vec<PersistedLine>,
    /// Bound restaurant, present iff `lines` is non-empty.
    pub bound_restaurant_id: Option<RestaurantId>,
}

/// One persisted line. The line subtotal is recomputed on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLine {
    /// Menu item id.
    pub item_id: MenuItemId,
    /// Restaurant of the item.
    pub restaurant_id: RestaurantId,
    /// Item name.
    pub name: String,
    /// Unit price.
    pub unit_price: Money,
    /// Quantity.
    pub quantity: u32,
}

/// Reasons a persisted cart is rejected on restore.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartRestoreError {
    /// A binding is recorded but there are no lines.
    #[error("cart has a bound restaurant but no lines")]
    BoundWithoutLines,
    /// Lines are recorded without a binding.
    #[error("cart has lines but no bound restaurant")]
    LinesWithoutBinding,
    /// A line belongs to another restaurant.
    #[error("line {item_id} belongs to a different restaurant")]
    MixedRestaurants {
        /// Offending item.
        item_id: MenuItemId,
    },
    /// A line has zero quantity.
    #[error("line {item_id} has zero quantity")]
    ZeroQuantity {
        /// Offending item.
        item_id: MenuItemId,
    },
    /// A line exceeds [`MAX_LINE_QUANTITY`].
    #[error("line {item_id} exceeds {MAX_LINE_QUANTITY} units")]
    QuantityTooLarge {
        /// Offending item.
        item_id: MenuItemId,
    },
    /// A line has a negative unit price.
    #[error("line {item_id} has a negative price")]
    NegativePrice {
        /// Offending item.
        item_id: MenuItemId,
    },
    /// The same item appears on two lines.
    #[error("item {item_id} appears more than once")]
    DuplicateItem {
        /// Offending item.
        item_id: MenuItemId,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;

    fn item(id: &str, restaurant: &str, cents: i64) -> CartItem {
        CartItem {
            item_id: MenuItemId::parse(id).unwrap(),
            restaurant_id: RestaurantId::parse(restaurant).unwrap(),
            name: format!("Item {id}"),
            unit_price: Money::from_cents(cents),
        }
    }

    fn id(raw: &str) -> MenuItemId {
        MenuItemId::parse(raw).unwrap()
    }

    #[test]
    fn test_end_to_end_totals_and_cross_restaurant_guard() {
        let mut cart = Cart::new();
        let a = item("a", "r1", 1000);
        let b = item("b", "r1", 500);

        cart.add_item(&a, 2).unwrap();
        cart.add_item(&b, 1).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Money::from_cents(2500));
        assert_eq!(totals.tax, Money::from_cents(250));
        assert_eq!(totals.total, Money::from_cents(2750));

        let other = item("c", "r2", 700);
        let err = cart.add_item(&other, 1).unwrap_err();
        assert_eq!(
            err,
            CartError::DifferentRestaurant {
                bound: RestaurantId::parse("r1").unwrap(),
                attempted: RestaurantId::parse("r2").unwrap(),
            }
        );
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.bound_restaurant().map(RestaurantId::as_str), Some("r1"));
        assert_eq!(cart.totals().subtotal, Money::from_cents(2500));
    }

    #[test]
    fn test_first_add_binds_restaurant() {
        let mut cart = Cart::new();
        assert!(cart.bound_restaurant().is_none());
        cart.add_item(&item("a", "r1", 100), 1).unwrap();
        assert_eq!(cart.bound_restaurant().map(RestaurantId::as_str), Some("r1"));
    }

    #[test]
    fn test_repeat_add_accumulates_quantity() {
        let mut cart = Cart::new();
        let a = item("a", "r1", 1000);
        cart.add_item(&a, 1).unwrap();
        cart.add_item(&a, 3).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity(), 4);
        assert_eq!(cart.lines()[0].line_subtotal(), Money::from_cents(4000));
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut cart = Cart::new();
        cart.add_item(&item("b", "r1", 100), 1).unwrap();
        cart.add_item(&item("a", "r1", 100), 1).unwrap();
        cart.add_item(&item("b", "r1", 100), 1).unwrap();

        let ids: Vec<_> = cart.lines().iter().map(|l| l.item_id().as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_zero_quantity_add_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 100), 0).unwrap();
        assert!(cart.is_empty());
        assert!(cart.bound_restaurant().is_none());
    }

    #[test]
    fn test_update_quantity_recomputes_line() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 250), 1).unwrap();
        cart.update_quantity(&id("a"), 4);

        assert_eq!(cart.lines()[0].quantity(), 4);
        assert_eq!(cart.totals().subtotal, Money::from_cents(1000));
    }

    #[test]
    fn test_update_quantity_to_zero_or_negative_removes() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 250), 1).unwrap();
        cart.add_item(&item("b", "r1", 250), 1).unwrap();

        cart.update_quantity(&id("a"), 0);
        assert!(cart.line(&id("a")).is_none());

        cart.update_quantity(&id("b"), -3);
        assert!(cart.is_empty());
        assert!(cart.bound_restaurant().is_none());
    }

    #[test]
    fn test_oversized_quantities_are_clamped() {
        let mut cart = Cart::new();
        let pricey = CartItem {
            unit_price: Money::new(Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0)),
            ..item("a", "r1", 0)
        };
        cart.add_item(&pricey, u32::MAX).unwrap();
        assert_eq!(cart.lines()[0].quantity(), MAX_LINE_QUANTITY);

        cart.update_quantity(&id("a"), i64::MAX);
        assert_eq!(cart.lines()[0].quantity(), MAX_LINE_QUANTITY);
        cart.add_item(&pricey, 5).unwrap();
        assert_eq!(cart.lines()[0].quantity(), MAX_LINE_QUANTITY);

        cart.update_quantity(&id("a"), 1_000);
        assert_eq!(cart.lines()[0].quantity(), MAX_LINE_QUANTITY);
        assert!(!cart.totals().total.is_negative());
    }

    #[test]
    fn test_restore_rejects_oversized_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 100), 1).unwrap();
        let mut persisted = cart.to_persisted();
        persisted.lines[0].quantity = MAX_LINE_QUANTITY + 1;
        assert_eq!(
            Cart::restore(persisted),
            Err(CartRestoreError::QuantityTooLarge { item_id: id("a") })
        );
    }

    #[test]
    fn test_update_unknown_item_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 250), 1).unwrap();
        let before = cart.clone();
        cart.update_quantity(&id("zzz"), 5);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_removing_last_line_releases_binding() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 250), 1).unwrap();
        assert!(cart.remove_item(&id("a")));
        assert!(cart.bound_restaurant().is_none());
        assert_eq!(cart.totals(), CartTotals::default());

        // Now a different restaurant is accepted.
        cart.add_item(&item("x", "r2", 100), 1).unwrap();
        assert_eq!(cart.bound_restaurant().map(RestaurantId::as_str), Some("r2"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 250), 2).unwrap();
        cart.clear();
        assert_eq!(cart, Cart::new());
    }

    #[test]
    fn test_item_count() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 250), 2).unwrap();
        cart.add_item(&item("b", "r1", 250), 3).unwrap();
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_persist_restore_keeps_lines_and_recomputes_totals() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 1000), 2).unwrap();
        cart.add_item(&item("b", "r1", 500), 1).unwrap();

        let json = serde_json::to_value(cart.to_persisted()).unwrap();
        assert!(json.get("boundRestaurantId").is_some());
        assert!(json.get("subtotal").is_none());

        let restored = Cart::restore(serde_json::from_value(json).unwrap()).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_restore_rejects_mixed_restaurants() {
        let persisted = PersistedCart {
            lines: vec![
                PersistedLine {
                    item_id: id("a"),
                    restaurant_id: RestaurantId::parse("r1").unwrap(),
                    name: "A".into(),
                    unit_price: Money::from_cents(100),
                    quantity: 1,
                },
                PersistedLine {
                    item_id: id("b"),
                    restaurant_id: RestaurantId::parse("r2").unwrap(),
                    name: "B".into(),
                    unit_price: Money::from_cents(100),
                    quantity: 1,
                },
            ],
            bound_restaurant_id: Some(RestaurantId::parse("r1").unwrap()),
        };
        assert_eq!(
            Cart::restore(persisted),
            Err(CartRestoreError::MixedRestaurants { item_id: id("b") })
        );
    }

    #[test]
    fn test_restore_rejects_inconsistent_binding() {
        let bound_only = PersistedCart {
            lines: Vec::new(),
            bound_restaurant_id: Some(RestaurantId::parse("r1").unwrap()),
        };
        assert_eq!(
            Cart::restore(bound_only),
            Err(CartRestoreError::BoundWithoutLines)
        );

        let lines_only = PersistedCart {
            lines: vec![PersistedLine {
                item_id: id("a"),
                restaurant_id: RestaurantId::parse("r1").unwrap(),
                name: "A".into(),
                unit_price: Money::from_cents(100),
                quantity: 1,
            }],
            bound_restaurant_id: None,
        };
        assert_eq!(
            Cart::restore(lines_only),
            Err(CartRestoreError::LinesWithoutBinding)
        );
    }

    #[test]
    fn test_restore_rejects_bad_lines() {
        let line = |item: &str, cents: i64, quantity: u32| PersistedLine {
            item_id: id(item),
            restaurant_id: RestaurantId::parse("r1").unwrap(),
            name: "X".into(),
            unit_price: Money::from_cents(cents),
            quantity,
        };
        let bound = Some(RestaurantId::parse("r1").unwrap());

        let zero = PersistedCart {
            lines: vec![line("a", 100, 0)],
            bound_restaurant_id: bound.clone(),
        };
        assert!(matches!(
            Cart::restore(zero),
            Err(CartRestoreError::ZeroQuantity { .. })
        ));

        let negative = PersistedCart {
            lines: vec![line("a", -100, 1)],
            bound_restaurant_id: bound.clone(),
        };
        assert!(matches!(
            Cart::restore(negative),
            Err(CartRestoreError::NegativePrice { .. })
        ));

        let duplicate = PersistedCart {
            lines: vec![line("a", 100, 1), line("a", 100, 2)],
            bound_restaurant_id: bound,
        };
        assert!(matches!(
            Cart::restore(duplicate),
            Err(CartRestoreError::DuplicateItem { .. })
        ));
    }

    #[test]
    fn test_to_order_lines_snapshots_lines() {
        let mut cart = Cart::new();
        cart.add_item(&item("a", "r1", 1000), 2).unwrap();
        let lines = cart.to_order_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].line_subtotal, Money::from_cents(2000));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add { item: u8, restaurant: u8, quantity: u32 },
        Update { item: u8, quantity: i64 },
        Remove { item: u8 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6, 0u8..2, 0u32..5).prop_map(|(item, restaurant, quantity)| Op::Add {
                item,
                restaurant,
                quantity
            }),
            (0u8..6, -2i64..6).prop_map(|(item, quantity)| Op::Update { item, quantity }),
            (0u8..6).prop_map(|item| Op::Remove { item }),
        ]
    }

    fn price_for(item: u8) -> i64 {
        i64::from(item) * 137 + 99
    }

    proptest! {
        #[test]
        fn prop_totals_always_match_lines(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let mut cart = Cart::new();
            for op in ops {
                match op {
                    Op::Add { item: i, restaurant, quantity } => {
                        let before = cart.clone();
                        let candidate = item(&format!("i{i}"), &format!("r{restaurant}"), price_for(i));
                        if cart.add_item(&candidate, quantity).is_err() {
                            prop_assert_eq!(&cart, &before);
                        }
                    }
                    Op::Update { item: i, quantity } => cart.update_quantity(&id(&format!("i{i}")), quantity),
                    Op::Remove { item: i } => { cart.remove_item(&id(&format!("i{i}"))); }
                }

                let expected: Decimal = cart
                    .lines()
                    .iter()
                    .map(|l| l.unit_price().amount() * Decimal::from(l.quantity()))
                    .sum();
                let totals = cart.totals();
                prop_assert_eq!(totals.subtotal.amount(), expected);
                prop_assert_eq!(totals.tax.rounded(), (expected * Decimal::new(10, 2)).round_dp(2));
                prop_assert_eq!(totals.total, totals.subtotal + totals.tax);
                prop_assert_eq!(cart.bound_restaurant().is_none(), cart.is_empty());
                if let Some(bound) = cart.bound_restaurant() {
                    prop_assert!(cart.lines().iter().all(|l| l.restaurant_id() == bound));
                }
            }
        }
    }
}
