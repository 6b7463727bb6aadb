//! Newtype IDs for type-safe entity references.
//!
//! Catalog and identity-provider IDs are opaque strings (document IDs, auth
//! UIDs). Use the `define_string_id!` macro to create wrappers that prevent
//! accidentally mixing IDs from different entity types.

/// Errors that can occur when parsing a string ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty or only whitespace.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Name of the ID type being parsed.
        kind: &'static str,
    },
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` as a bare string; deserializing runs the
///   same validation as `parse()`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - A validating `parse()` that rejects blank input
/// - `as_str()`, `Display`, `AsRef<str>` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use dukicks_core::define_string_id;
/// define_string_id!(OrderRef);
/// define_string_id!(CouponCode);
///
/// let order = OrderRef::parse("ord_1").unwrap();
/// let coupon = CouponCode::parse("ord_1").unwrap();
/// assert_eq!(order.as_str(), coupon.as_str());
///
/// // These are different types, so this won't compile:
/// // let _: OrderRef = coupon;
/// ```
#[macro_export]
macro_rules! define_string_id {
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
            /// Parse an ID, rejecting empty or whitespace-only input.
            ///
            /// # Errors
            ///
            /// Returns `IdError::Empty` if the trimmed input is empty.
            pub fn parse(id: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err($crate::IdError::Empty {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(id))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert into the inner string.
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::convert::TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(id: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(id)
            }
        }

        impl ::core::convert::From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_string_id!(ProductId);
define_string_id!(UserId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(
            ProductId::parse("").unwrap_err(),
            IdError::Empty { kind: "ProductId" }
        );
        assert!(UserId::parse("   ").is_err());
    }

    #[test]
    fn test_serde_as_bare_string() {
        let id = ProductId::parse("nike-air-max").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"nike-air-max\"");

        let parsed: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_deserialize_rejects_blank() {
        assert!(serde_json::from_str::<ProductId>("\"\"").is_err());
        assert!(serde_json::from_str::<UserId>("\"  \"").is_err());
    }

    #[test]
    fn test_display_and_from_str() {
        let id: UserId = "uid_42".parse().unwrap();
        assert_eq!(id.to_string(), "uid_42");
        assert_eq!(id.as_ref(), "uid_42");
    }
}
