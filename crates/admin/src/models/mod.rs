//! Request bodies for onboarding and menu management.
//!
//! Every body is validated into a typed value before it reaches the
//! database; failures are reported per field.

mod forms;

pub use forms::{
    CategoryInput, MenuItemInput, NewCategory, NewRestaurant, RestaurantInput, RestaurantPatch,
    ValidMenuItem,
};
