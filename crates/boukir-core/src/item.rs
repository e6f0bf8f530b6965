//! Document line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::delta::DeltaKey;
use crate::error::{CoreError, Result};
use crate::lenient;
use crate::{ProductId, SnapshotId, UnitId, VariantId};

/// One product line of a document.
///
/// Items arrive from forms with loosely typed numbers, so every numeric field goes through
/// the lenient deserializers. Pricing fields are stored but ignored by stock reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identity. Items without one are skipped by the delta builder.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub product_id: Option<ProductId>,

    /// Variant identity, when the product is sold by variant.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub variant_id: Option<VariantId>,

    /// Sale unit.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub unit_id: Option<UnitId>,

    /// Quantity, non-negative as stored.
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub quantite: Option<Decimal>,

    /// Unit sale price.
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub prix_unitaire: Option<Decimal>,

    /// Discount percentage.
    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub remise_pourcentage: Decimal,

    /// Discount amount per unit.
    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub remise_montant: Decimal,

    /// Line total.
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub total: Option<Decimal>,

    /// Purchase price of the product, filled when items are read back.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub prix_achat: Option<Decimal>,

    /// Stock lot the line was sold from. Only cash credit notes move it.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub product_snapshot_id: Option<SnapshotId>,

    /// Cost price of the product, filled when items are read back.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub cout_revient: Option<Decimal>,
}

impl LineItem {
    /// Create a bare stock line (no pricing).
    #[must_use]
    pub fn stock_line(product_id: ProductId, variant_id: Option<VariantId>, quantite: Decimal) -> Self {
        Self {
            product_id: Some(product_id),
            variant_id,
            quantite: Some(quantite),
            ..Self::default()
        }
    }

    /// Check that the fields required to persist the line are present.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` when product, quantity, unit price or total is missing,
    /// or when a value does not fit its column (`NUMERIC(12,3)` quantities, `NUMERIC(12,2)`
    /// amounts, `NUMERIC(5,2)` percentages).
    pub fn validate(&self) -> Result<()> {
        let (Some(_), Some(quantite), Some(prix_unitaire), Some(total)) =
            (self.product_id, self.quantite, self.prix_unitaire, self.total)
        else {
            return Err(CoreError::validation(
                "Item invalide: champs requis manquants",
            ));
        };

        let amounts_fit = [prix_unitaire, total, self.remise_montant]
            .into_iter()
            .all(|amount| lenient::fits_numeric(amount, 12, 2));
        if !lenient::fits_numeric(quantite, 12, 3)
            || !lenient::fits_numeric(self.remise_pourcentage, 5, 2)
            || !amounts_fit
        {
            return Err(CoreError::validation("Item invalide: valeur hors limites"));
        }
        Ok(())
    }

    /// The quantity that drives stock: missing or negative quantities count as zero.
    #[must_use]
    pub fn stock_quantity(&self) -> Decimal {
        lenient::coerce_quantity(self.quantite)
    }

    /// The delta key of the line, if it carries a product identity.
    #[must_use]
    pub fn delta_key(&self) -> Option<DeltaKey> {
        self.product_id
            .map(|product_id| DeltaKey::new(product_id, self.variant_id))
    }

    /// Whether the line designates the same product, variant and unit as `other`.
    #[must_use]
    pub fn same_line_as(&self, other: &Self) -> bool {
        self.product_id == other.product_id
            && self.variant_id == other.variant_id
            && self.unit_id == other.unit_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn parses_loose_form_values() {
        let item: LineItem = serde_json::from_value(json!({
            "product_id": "5",
            "variant_id": "",
            "unit_id": 0,
            "quantite": "3",
            "prix_unitaire": 12.5,
            "total": "37.5"
        }))
        .unwrap();

        assert_eq!(item.product_id, Some(ProductId::new(5)));
        assert_eq!(item.variant_id, None);
        assert_eq!(item.unit_id, None);
        assert_eq!(item.quantite, Some(dec!(3)));
        assert_eq!(item.prix_unitaire, Some(dec!(12.5)));
        assert_eq!(item.remise_montant, Decimal::ZERO);
        assert!(item.validate().is_ok());
    }

    #[test]
    fn missing_price_is_invalid() {
        let item: LineItem = serde_json::from_value(json!({
            "product_id": 5,
            "quantite": 3,
            "total": 30
        }))
        .unwrap();
        assert!(matches!(item.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn oversized_values_are_invalid() {
        let item: LineItem = serde_json::from_value(json!({
            "product_id": 5,
            "quantite": "79228162514264337593543950335",
            "prix_unitaire": 1,
            "total": 1
        }))
        .unwrap();
        let err = item.validate().unwrap_err();
        assert_eq!(err.to_string(), "Item invalide: valeur hors limites");

        let item: LineItem = serde_json::from_value(json!({
            "product_id": 5,
            "quantite": 1,
            "prix_unitaire": "10000000000",
            "total": 1
        }))
        .unwrap();
        assert!(matches!(item.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn snapshot_id_is_read_leniently() {
        let item: LineItem = serde_json::from_value(json!({
            "product_id": 5,
            "product_snapshot_id": "12"
        }))
        .unwrap();
        assert_eq!(item.product_snapshot_id, Some(SnapshotId::new(12)));
    }

    #[test]
    fn enrichment_fields_are_not_read_from_input() {
        let item: LineItem = serde_json::from_value(json!({
            "product_id": 5,
            "prix_achat": 99
        }))
        .unwrap();
        assert_eq!(item.prix_achat, None);
    }

    #[test]
    fn garbage_quantity_counts_as_zero() {
        let item: LineItem = serde_json::from_value(json!({
            "product_id": 5,
            "quantite": "trois"
        }))
        .unwrap();
        assert_eq!(item.stock_quantity(), Decimal::ZERO);
    }
}
