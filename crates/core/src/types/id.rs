//! Newtype IDs for type-safe entity references.
//!
//! Commerce identifiers are opaque strings assigned by the remote storefront
//! (e.g. `gid://shopify/ProductVariant/42`) or by the local catalog. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing IDs
//! from different entity types.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, `AsRef<str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use kimba_core::define_id;
/// define_id!(PetId);
/// define_id!(BookingId);
///
/// let pet = PetId::new("pet-1");
/// let booking = BookingId::new("pet-1");
///
/// // These are different types, so this won't compile:
/// // let _: PetId = booking;
/// assert_eq!(pet.as_str(), booking.as_str());
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
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
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

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
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
    };
}

// Remote storefront entities
define_id!(ProductId);
define_id!(VariantId);
define_id!(CartId);

// Locally modeled catalog (apparel)
define_id!(LocalProductId);
