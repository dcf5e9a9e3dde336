//! Newtype IDs for type-safe document references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! Document IDs are opaque strings assigned by the server. They are
//! generated as UUID v4 values in simple (hyphen-less) form, but any
//! non-empty string without whitespace is accepted when decoding, since
//! historic records may carry ids minted elsewhere.

/// Errors that can occur when parsing an ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The input is longer than [`MAX_ID_LENGTH`].
    #[error("id must be at most {MAX_ID_LENGTH} characters")]
    TooLong,
    /// The input contains whitespace or control characters.
    #[error("id contains invalid characters")]
    InvalidCharacters,
}

/// Maximum accepted length of a document id.
pub const MAX_ID_LENGTH: usize = 128;

/// Validate a raw id string.
///
/// # Errors
///
/// Returns an [`IdError`] if the id is empty, too long, or contains
/// whitespace/control characters.
pub fn validate_id(raw: &str) -> Result<(), IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }
    if raw.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong);
    }
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(IdError::InvalidCharacters);
    }
    Ok(())
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` (deserialization validates via [`validate_id`])
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()`, `generate()`, `as_str()`, `into_inner()`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use plateful_core::define_id;
/// define_id!(TableId);
/// define_id!(WaiterId);
///
/// let table = TableId::parse("t-1").unwrap();
/// let waiter = WaiterId::parse("t-1").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: TableId = waiter;
/// # let _ = (table, waiter);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an ID from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is not a valid document id.
            pub fn parse(raw: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                $crate::types::id::validate_id(raw)?;
                Ok(Self(raw.to_owned()))
            }

            /// Generate a fresh random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::__private::Uuid::new_v4().simple().to_string())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::types::id::IdError;

            fn try_from(value: String) -> ::core::result::Result<Self, Self::Error> {
                $crate::types::id::validate_id(&value)?;
                Ok(Self(value))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let raw = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self::try_from(raw)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define standard entity IDs
define_id!(RestaurantId);
define_id!(OrderId);
define_id!(MenuItemId);
define_id!(CategoryId);
define_id!(UserId);

impl OrderId {
    /// Short, human-friendly reference used in notifications and receipts.
    ///
    /// The first eight characters of the id, uppercased.
    #[must_use]
    pub fn short_ref(&self) -> String {
        self.0.chars().take(8).collect::<String>().to_uppercase()
    }
}
