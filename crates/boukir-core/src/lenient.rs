//! Lenient parsing of numbers coming from back-office forms.
//!
//! Forms send quantities and ids as numbers, numeric strings, empty strings or `null`,
//! depending on the screen. These helpers accept all of them and map anything unusable to
//! `None` instead of rejecting the whole request.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an optional decimal from a number, a numeric string or `null`.
///
/// # Errors
///
/// Only fails when the underlying deserializer fails; unusable values become `None`.
pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

/// Deserialize a decimal that defaults to zero when absent or unusable.
///
/// # Errors
///
/// Only fails when the underlying deserializer fails.
pub fn decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_decimal(deserializer)?.unwrap_or(Decimal::ZERO))
}

/// Deserialize an optional positive identifier.
///
/// Zero, negative and non-integer values are treated as "no identity".
///
/// # Errors
///
/// Only fails when the underlying deserializer fails.
pub fn opt_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<PositiveId>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(positive_from_value)
        .map(|raw| T::from(PositiveId(raw))))
}

/// A raw key already checked to be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositiveId(pub(crate) i64);

macro_rules! from_positive {
    ($($id:ty),+) => {
        $(impl From<PositiveId> for $id {
            fn from(raw: PositiveId) -> Self {
                <$id>::new(raw.0)
            }
        })+
    };
}

from_positive!(
    crate::ProductId,
    crate::VariantId,
    crate::UnitId,
    crate::UserId,
    crate::DocumentId,
    crate::SnapshotId
);

/// Extract a decimal from a JSON value.
#[must_use]
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Decimal::from_str(s).ok()
            }
        }
        _ => None,
    }
}

fn positive_from_value(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (raw > 0).then_some(raw)
}

/// Coerce a stored quantity to the non-negative amount that drives stock.
///
/// Missing quantities contribute nothing; negative ones are clamped to zero.
#[must_use]
pub fn coerce_quantity(quantite: Option<Decimal>) -> Decimal {
    quantite
        .filter(|q| q.is_sign_positive())
        .unwrap_or(Decimal::ZERO)
}

/// Whether `value` fits a `NUMERIC(precision, scale)` column.
#[must_use]
pub fn fits_numeric(value: Decimal, precision: u32, scale: u32) -> bool {
    let digits = precision.saturating_sub(scale).min(18);
    value.abs() < Decimal::from(10_i64.pow(digits))
}
