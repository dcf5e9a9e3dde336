//! JSON views returned by the storefront.

use serde::Serialize;

use plateful_core::cart::{Cart, CartLine, CartTotals};
use plateful_core::menu::{Category, MenuItem, Restaurant};
use plateful_core::{CategoryId, RestaurantId};

/// A restaurant's menu grouped by category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuView {
    pub restaurant: Restaurant,
    pub sections: Vec<MenuSection>,
}

/// One category and its available items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSection {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub items: Vec<MenuItem>,
}

/// Label for items without a (known) category.
pub const UNCATEGORIZED: &str = "Other";

impl MenuView {
    /// Group items under their categories, in category order.
    ///
    /// Items without a category, or whose category is unknown, are gathered
    /// into a trailing section. Empty categories are omitted.
    #[must_use]
    pub fn group(restaurant: Restaurant, categories: Vec<Category>, items: Vec<MenuItem>) -> Self {
        let mut sections: Vec<MenuSection> = categories
            .into_iter()
            .map(|c| MenuSection {
                category_id: Some(c.id),
                name: c.name,
                items: Vec::new(),
            })
            .collect();
        let mut other = Vec::new();

        for item in items {
            let slot = item.category_id.as_ref().and_then(|id| {
                sections
                    .iter_mut()
                    .find(|s| s.category_id.as_ref() == Some(id))
            });
            match slot {
                Some(section) => section.items.push(item),
                None => other.push(item),
            }
        }

        sections.retain(|s| !s.items.is_empty());
        if !other.is_empty() {
            sections.push(MenuSection {
                category_id: None,
                name: UNCATEGORIZED.to_string(),
                items: other,
            });
        }

        Self {
            restaurant,
            sections,
        }
    }
}

/// Cart contents with derived totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub bound_restaurant_id: Option<RestaurantId>,
    pub item_count: u32,
    pub totals: CartTotals,
    /// Totals rounded for display (e.g. `$27.50`).
    pub display: DisplayTotals,
}

/// Rounded, formatted totals.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayTotals {
    pub subtotal: String,
    pub tax: String,
    pub total: String,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let totals = cart.totals();
        Self {
            lines: cart.lines().to_vec(),
            bound_restaurant_id: cart.bound_restaurant().cloned(),
            item_count: cart.item_count(),
            totals,
            display: DisplayTotals {
                subtotal: totals.subtotal.display(),
                tax: totals.tax.display(),
                total: totals.total.display(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use plateful_core::{MenuItemId, Money};

    use super::*;

    fn restaurant() -> Restaurant {
        Restaurant {
            id: RestaurantId::parse("r1").unwrap(),
            name: "Noodle Bar".into(),
            slug: "noodle-bar".into(),
            description: String::new(),
            address: String::new(),
            phone: String::new(),
            is_active: true,
            owner_user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(id: &str, category: Option<&str>) -> MenuItem {
        MenuItem {
            id: MenuItemId::parse(id).unwrap(),
            restaurant_id: RestaurantId::parse("r1").unwrap(),
            category_id: category.map(|c| CategoryId::parse(c).unwrap()),
            name: id.to_string(),
            description: String::new(),
            price: Money::from_cents(500),
            is_available: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category(id: &str, name: &str, position: i32) -> Category {
        Category {
            id: CategoryId::parse(id).unwrap(),
            restaurant_id: RestaurantId::parse("r1").unwrap(),
            name: name.into(),
            position,
        }
    }

    #[test]
    fn test_group_by_category() {
        let view = MenuView::group(
            restaurant(),
            vec![
                category("starters", "Starters", 0),
                category("mains", "Mains", 1),
                category("empty", "Desserts", 2),
            ],
            vec![
                item("ramen", Some("mains")),
                item("gyoza", Some("starters")),
                item("tea", None),
                item("mystery", Some("deleted")),
            ],
        );

        let names: Vec<_> = view.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Starters", "Mains", UNCATEGORIZED]);
        assert_eq!(view.sections[2].items.len(), 2);
    }

    #[test]
    fn test_cart_view_formats_totals() {
        let mut cart = Cart::new();
        cart.add_item(&item("ramen", None).to_cart_item(), 5).unwrap();
        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 5);
        assert_eq!(view.display.subtotal, "$25.00");
        assert_eq!(view.display.tax, "$2.50");
        assert_eq!(view.display.total, "$27.50");
    }
}
