//! Profit and margin of a document ("mouvement").

use rust_decimal::Decimal;
use serde::Serialize;

use crate::document::DocumentKind;
use crate::item::LineItem;
use crate::policy::policy;

/// Profit summary of a document's items, returned by list endpoints on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MouvementCalc {
    /// Sum of `(price - cost) * quantity`, less line discounts for kinds that apply them.
    pub profit: Decimal,
    /// Sum of `cost * quantity`.
    #[serde(rename = "costBase")]
    pub cost_base: Decimal,
    /// `profit / cost_base * 100`, rounded to two places; absent unless the cost base is
    /// positive.
    #[serde(rename = "marginPct")]
    pub margin_pct: Option<Decimal>,
}

impl MouvementCalc {
    /// Compute the summary of the `items` of a document of `kind`.
    ///
    /// The unit cost is `cout_revient` when present, else `prix_achat`, else zero. Sums
    /// saturate instead of overflowing.
    #[must_use]
    pub fn compute(kind: DocumentKind, items: &[LineItem]) -> Self {
        let applies_discount = policy(kind).applies_discount;
        let mut profit = Decimal::ZERO;
        let mut cost_base = Decimal::ZERO;
        for item in items {
            let quantity = item.stock_quantity();
            let price = item.prix_unitaire.unwrap_or(Decimal::ZERO);
            let cost = item
                .cout_revient
                .or(item.prix_achat)
                .unwrap_or(Decimal::ZERO);
            let mut line = price.saturating_sub(cost).saturating_mul(quantity);
            if applies_discount {
                line = line.saturating_sub(item.remise_montant.saturating_mul(quantity));
            }
            profit = profit.saturating_add(line);
            cost_base = cost_base.saturating_add(cost.saturating_mul(quantity));
        }
        let margin_pct = (cost_base > Decimal::ZERO)
            .then(|| profit.checked_div(cost_base))
            .flatten()
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| pct.round_dp(2));
        Self {
            profit,
            cost_base,
            margin_pct,
        }
    }
}
