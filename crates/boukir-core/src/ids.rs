//! Identifier types.
//!
//! Every table in the back office is keyed by a positive integer primary key. The
//! `int_id_type!` macro wraps each key in its own newtype so that a product id can never be
//! passed where a variant id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to define an integer identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `i64` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `Serialize`, `Deserialize` (as a JSON number)
/// - `FromStr`, `Display`, `Debug`
/// - `From<$name> for i64`
///
/// # Example
///
/// ```ignore
/// int_id_type!(MyId, "A custom identifier type.");
/// let id = MyId::new(7);
/// let parsed: MyId = "7".parse().unwrap();
/// ```
macro_rules! int_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw primary key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw primary key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw: i64 = s.trim().parse().map_err(|_| IdError::NotAnInteger)?;
                if raw <= 0 {
                    return Err(IdError::NotPositive(raw));
                }
                Ok(Self(raw))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

int_id_type!(ProductId, "A product identifier (`products.id`).");
int_id_type!(VariantId, "A product variant identifier (`product_variants.id`).");
int_id_type!(UnitId, "A sale unit identifier (`product_units.id`).");
int_id_type!(DocumentId, "A document identifier, unique within its document kind.");
int_id_type!(UserId, "An employee identifier, as carried by the JWT `id` claim.");
int_id_type!(SnapshotId, "A product snapshot (stock lot) identifier (`product_snapshot.id`).");

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not an integer.
    #[error("identifier is not an integer")]
    NotAnInteger,

    /// The input is zero or negative.
    #[error("identifier must be positive, got {0}")]
    NotPositive(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_parses_trimmed_input() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn zero_is_not_an_identity() {
        assert_eq!("0".parse::<VariantId>(), Err(IdError::NotPositive(0)));
        assert_eq!("abc".parse::<VariantId>(), Err(IdError::NotAnInteger));
    }

    #[test]
    fn ids_serialize_as_numbers() {
        let json = serde_json::to_string(&DocumentId::new(12)).unwrap();
        assert_eq!(json, "12");
        let parsed: DocumentId = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, DocumentId::new(12));
    }

    #[test]
    fn debug_names_the_type() {
        assert_eq!(format!("{:?}", UserId::new(3)), "UserId(3)");
    }
}
