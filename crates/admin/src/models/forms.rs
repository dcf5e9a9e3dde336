use rust_decimal::Decimal;
use serde::Deserialize;

use plateful_core::menu::slugify;
use plateful_core::order::FieldError;
use plateful_core::{CategoryId, Money, UserId};

fn field_error(field: &'static str, message: impl Into<String>) -> FieldError {
    FieldError {
        field,
        message: message.into(),
    }
}

fn required_name(errors: &mut Vec<FieldError>, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field_error("name", "name is required"));
    }
    value.to_owned()
}

/// `POST /restaurants` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub owner_user_id: Option<String>,
}

/// A validated restaurant ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRestaurant {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub owner_user_id: Option<UserId>,
}

impl RestaurantInput {
    /// Validate and derive the slug from the name.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per invalid field.
    pub fn validate(self) -> Result<NewRestaurant, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = required_name(&mut errors, &self.name);
        let slug = slugify(&name);
        if !name.is_empty() && slug.is_empty() {
            errors.push(field_error("name", "name must contain a letter or digit"));
        }
        let owner_user_id = match self.owner_user_id.map(UserId::try_from).transpose() {
            Ok(id) => id,
            Err(e) => {
                errors.push(field_error("ownerUserId", e.to_string()));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewRestaurant {
            name,
            slug,
            description: self.description.trim().to_owned(),
            address: self.address.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            owner_user_id,
        })
    }
}

/// `PUT /restaurants/{id}` body; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl RestaurantPatch {
    /// Trim text fields and reject a blank name.
    ///
    /// The slug is never changed by an update so existing links keep working.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] if `name` is present but blank.
    pub fn validate(self) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = self.name.map(|n| required_name(&mut errors, &n));
        if !errors.is_empty() {
            return Err(errors);
        }
        let trim = |v: Option<String>| v.map(|s| s.trim().to_owned());
        Ok(Self {
            name,
            description: trim(self.description),
            address: trim(self.address),
            phone: trim(self.phone),
            is_active: self.is_active,
        })
    }
}

/// `POST /restaurants/{id}/categories` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Option<i32>,
}

/// A validated category ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub position: Option<i32>,
}

impl CategoryInput {
    /// Validate the category name.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] if the name is blank.
    pub fn validate(self) -> Result<NewCategory, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = required_name(&mut errors, &self.name);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewCategory {
            name,
            position: self.position,
        })
    }
}

/// Menu item body for both create and full replace.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

const fn default_available() -> bool {
    true
}

/// A validated menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidMenuItem {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category_id: Option<CategoryId>,
    pub is_available: bool,
    pub image_url: Option<String>,
}

impl MenuItemInput {
    /// Validate name, price and optional references.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per invalid field.
    pub fn validate(self) -> Result<ValidMenuItem, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = required_name(&mut errors, &self.name);

        let price = match self.price {
            None => {
                errors.push(field_error("price", "price is required"));
                Money::ZERO
            }
            Some(p) if Money::new(p).is_negative() => {
                errors.push(field_error("price", "price cannot be negative"));
                Money::ZERO
            }
            Some(p) if Money::new(p) > Money::MAX_UNIT_PRICE => {
                errors.push(field_error(
                    "price",
                    format!("price cannot exceed {}", Money::MAX_UNIT_PRICE.display()),
                ));
                Money::ZERO
            }
            Some(p) => Money::new(p),
        };

        let category_id = match self
            .category_id
            .filter(|c| !c.trim().is_empty())
            .map(CategoryId::try_from)
            .transpose()
        {
            Ok(id) => id,
            Err(e) => {
                errors.push(field_error("categoryId", e.to_string()));
                None
            }
        };

        let image_url = self
            .image_url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());
        if image_url
            .as_deref()
            .is_some_and(|url| url::Url::parse(url).is_err())
        {
            errors.push(field_error("imageUrl", "image URL is not a valid URL"));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ValidMenuItem {
            name,
            description: self.description.trim().to_owned(),
            price,
            category_id,
            is_available: self.is_available,
            image_url,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_restaurant_slug_derived_from_name() {
        let restaurant = RestaurantInput {
            name: "  Thai Garden ".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(restaurant.name, "Thai Garden");
        assert_eq!(restaurant.slug, "thai-garden");
    }

    #[test]
    fn test_restaurant_requires_alphanumeric_name() {
        let errors = RestaurantInput {
            name: "!!!".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "name");

        let errors = RestaurantInput::default().validate().unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_patch_rejects_blank_name_only_when_present() {
        assert!(RestaurantPatch::default().validate().is_ok());
        let patch = RestaurantPatch {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_menu_item_rejects_negative_price() {
        let errors = MenuItemInput {
            name: "Pad Thai".into(),
            price: Some(dec("-1.00")),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "price");
    }

    #[test]
    fn test_menu_item_caps_price() {
        let errors = MenuItemInput {
            name: "Caviar".into(),
            price: Some(dec("100000000000000000000")),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.first().unwrap().field, "price");

        let item = MenuItemInput {
            name: "Tasting menu".into(),
            price: Some(dec("10000.00")),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(item.price, Money::MAX_UNIT_PRICE);
    }

    #[test]
    fn test_menu_item_allows_free_items() {
        let item = MenuItemInput {
            name: "Tap water".into(),
            price: Some(dec("0")),
            is_available: true,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(item.price, Money::ZERO);
    }

    #[test]
    fn test_menu_item_reports_every_problem() {
        let errors = MenuItemInput {
            image_url: Some("not a url".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "price", "imageUrl"]);
    }

    #[test]
    fn test_menu_item_defaults_to_available() {
        let input: MenuItemInput =
            serde_json::from_str(r#"{"name":"Soup","price":"4.50","categoryId":""}"#).unwrap();
        assert!(input.is_available);
        let item = input.validate().unwrap();
        assert_eq!(item.category_id, None);
        assert_eq!(item.price, Money::from_cents(450));
    }
}
