//! Per-kind stock policy table.
//!
//! The sign convention of each document kind lives here, explicitly, instead of being
//! implied by the route that handles it. Adding a kind means adding a row.

use serde::Serialize;

use crate::delta::Direction;
use crate::document::{DocumentKind, Statut};
use crate::error::{CoreError, Result};

/// The product stock column a document kind moves for lines without variant.
///
/// Lines with a variant always move the variant's own stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockColumn {
    /// Shop stock (`products.quantite`).
    Shared,
    /// Stock shared with the e-commerce front (`products.stock_partage_ecom_qty`).
    Ecommerce,
}

impl StockColumn {
    /// The column name in the `products` table.
    #[must_use]
    pub const fn product_column(self) -> &'static str {
        match self {
            Self::Shared => "quantite",
            Self::Ecommerce => "stock_partage_ecom_qty",
        }
    }
}

/// How a document kind affects stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPolicy {
    /// The kind this policy applies to.
    pub kind: DocumentKind,
    /// Direction of the items' effect while the document is not cancelled.
    pub active_direction: Direction,
    /// Product stock column moved by lines without variant.
    pub column: StockColumn,
    /// Prefix of the display number.
    pub numero_prefix: &'static str,
    /// Statuses a document of this kind may take.
    pub statuses: &'static [Statut],
    /// Whether a document must carry at least one line.
    pub requires_items: bool,
    /// Whether lines also move the product snapshot (stock lot) they reference.
    pub tracks_snapshots: bool,
    /// Whether line discounts reduce the document profit.
    pub applies_discount: bool,
}

const AVOIR_STATUSES: &[Statut] = &[
    Statut::EnAttente,
    Statut::Valide,
    Statut::Applique,
    Statut::Annule,
];

const POLICIES: [StockPolicy; 3] = [
    StockPolicy {
        kind: DocumentKind::AvoirClient,
        active_direction: Direction::Add,
        column: StockColumn::Shared,
        numero_prefix: "AVC",
        statuses: AVOIR_STATUSES,
        requires_items: false,
        tracks_snapshots: false,
        applies_discount: true,
    },
    StockPolicy {
        kind: DocumentKind::AvoirComptant,
        active_direction: Direction::Add,
        column: StockColumn::Shared,
        numero_prefix: "AVCC",
        statuses: AVOIR_STATUSES,
        requires_items: false,
        tracks_snapshots: true,
        applies_discount: true,
    },
    StockPolicy {
        kind: DocumentKind::AvoirEcommerce,
        active_direction: Direction::Add,
        column: StockColumn::Ecommerce,
        numero_prefix: "AVE",
        statuses: AVOIR_STATUSES,
        requires_items: true,
        tracks_snapshots: false,
        applies_discount: false,
    },
];

/// Look up the policy of `kind`.
#[must_use]
pub fn policy(kind: DocumentKind) -> &'static StockPolicy {
    match kind {
        DocumentKind::AvoirClient => &POLICIES[0],
        DocumentKind::AvoirComptant => &POLICIES[1],
        DocumentKind::AvoirEcommerce => &POLICIES[2],
    }
}

impl StockPolicy {
    /// Check that `statut` is one of the kind's statuses.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidStatus` otherwise.
    pub fn ensure_allowed(&self, statut: Statut) -> Result<()> {
        if self.statuses.contains(&statut) {
            Ok(())
        } else {
            Err(CoreError::InvalidStatus(statut.label().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_kind() {
        for kind in DocumentKind::ALL {
            assert_eq!(policy(kind).kind, kind);
        }
    }

    #[test]
    fn credit_notes_add_to_stock() {
        for kind in DocumentKind::ALL {
            assert_eq!(policy(kind).active_direction, Direction::Add);
        }
    }

    #[test]
    fn ecommerce_moves_the_shared_ecommerce_column() {
        assert_eq!(
            policy(DocumentKind::AvoirEcommerce).column.product_column(),
            "stock_partage_ecom_qty"
        );
        assert_eq!(
            policy(DocumentKind::AvoirComptant).column.product_column(),
            "quantite"
        );
    }

    #[test]
    fn only_cash_credit_notes_move_snapshots() {
        assert!(policy(DocumentKind::AvoirComptant).tracks_snapshots);
        assert!(!policy(DocumentKind::AvoirClient).tracks_snapshots);
        assert!(!policy(DocumentKind::AvoirEcommerce).tracks_snapshots);
    }

    #[test]
    fn ecommerce_profit_ignores_discounts() {
        assert!(policy(DocumentKind::AvoirClient).applies_discount);
        assert!(policy(DocumentKind::AvoirComptant).applies_discount);
        assert!(!policy(DocumentKind::AvoirEcommerce).applies_discount);
    }

    #[test]
    fn delivered_is_not_a_credit_note_status() {
        let avoir = policy(DocumentKind::AvoirClient);
        assert!(avoir.ensure_allowed(Statut::Valide).is_ok());
        assert!(avoir.ensure_allowed(Statut::Livre).is_err());
    }
}
