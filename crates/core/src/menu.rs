//! Restaurants, menu categories and menu items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::types::{CategoryId, MenuItemId, Money, RestaurantId, UserId};

/// A tenant restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub is_active: bool,
    pub owner_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A menu section within a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub position: i32,
}

/// A sellable menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// The cart-facing view of this item, carrying the live name and price.
    #[must_use]
    pub fn to_cart_item(&self) -> CartItem {
        CartItem {
            item_id: self.id.clone(),
            restaurant_id: self.restaurant_id.clone(),
            name: self.name.clone(),
            unit_price: self.price,
        }
    }
}

/// Derive a URL slug from a display name.
///
/// Lowercases ASCII alphanumerics and collapses everything else into single
/// hyphens. Returns an empty string if the name has no alphanumerics.
///
/// ```
/// use plateful_core::menu::slugify;
///
/// assert_eq!(slugify("Luigi's Pizza & Pasta"), "luigi-s-pizza-pasta");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Reasons a stored menu record is rejected.
#[derive(Debug, thiserror::Error)]
pub enum MenuDecodeError {
    #[error("invalid id: {0}")]
    Id(#[from] crate::types::IdError),
    #[error("{0} has an empty name")]
    EmptyName(&'static str),
    #[error("menu item {0} has a negative price")]
    NegativePrice(MenuItemId),
}

#[cfg(feature = "postgres")]
pub use rows::{CategoryRow, MenuItemRow, RestaurantRow};

#[cfg(feature = "postgres")]
mod rows {
    use chrono::{DateTime, Utc};

    use super::{Category, MenuDecodeError, MenuItem, Restaurant};
    use crate::types::{CategoryId, MenuItemId, Money, RestaurantId, UserId};

    /// Raw `restaurants` row.
    #[derive(Debug, sqlx::FromRow)]
    pub struct RestaurantRow {
        pub id: String,
        pub name: String,
        pub slug: String,
        pub description: String,
        pub address: String,
        pub phone: String,
        pub is_active: bool,
        pub owner_user_id: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl TryFrom<RestaurantRow> for Restaurant {
        type Error = MenuDecodeError;

        fn try_from(row: RestaurantRow) -> Result<Self, Self::Error> {
            if row.name.trim().is_empty() {
                return Err(MenuDecodeError::EmptyName("restaurant"));
            }
            Ok(Self {
                id: RestaurantId::try_from(row.id)?,
                name: row.name,
                slug: row.slug,
                description: row.description,
                address: row.address,
                phone: row.phone,
                is_active: row.is_active,
                owner_user_id: row.owner_user_id.map(UserId::try_from).transpose()?,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
        }
    }

    /// Raw `categories` row.
    #[derive(Debug, sqlx::FromRow)]
    pub struct CategoryRow {
        pub id: String,
        pub restaurant_id: String,
        pub name: String,
        pub position: i32,
    }

    impl TryFrom<CategoryRow> for Category {
        type Error = MenuDecodeError;

        fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
            if row.name.trim().is_empty() {
                return Err(MenuDecodeError::EmptyName("category"));
            }
            Ok(Self {
                id: CategoryId::try_from(row.id)?,
                restaurant_id: RestaurantId::try_from(row.restaurant_id)?,
                name: row.name,
                position: row.position,
            })
        }
    }

    /// Raw `menu_items` row.
    #[derive(Debug, sqlx::FromRow)]
    pub struct MenuItemRow {
        pub id: String,
        pub restaurant_id: String,
        pub category_id: Option<String>,
        pub name: String,
        pub description: String,
        pub price: Money,
        pub is_available: bool,
        pub image_url: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl TryFrom<MenuItemRow> for MenuItem {
        type Error = MenuDecodeError;

        fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
            let id = MenuItemId::try_from(row.id)?;
            if row.name.trim().is_empty() {
                return Err(MenuDecodeError::EmptyName("menu item"));
            }
            if row.price.is_negative() {
                return Err(MenuDecodeError::NegativePrice(id));
            }
            Ok(Self {
                id,
                restaurant_id: RestaurantId::try_from(row.restaurant_id)?,
                category_id: row.category_id.map(CategoryId::try_from).transpose()?,
                name: row.name,
                description: row.description,
                price: row.price,
                is_available: row.is_available,
                image_url: row.image_url,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Thai Garden"), "thai-garden");
        assert_eq!(slugify("  --Crème Brûlée Café!! "), "cr-me-br-l-e-caf");
        assert_eq!(slugify("123 Main"), "123-main");
        assert_eq!(slugify("!!!"), "");
    }
}
