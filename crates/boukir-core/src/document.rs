//! Stock-affecting documents ("bons").
//!
//! This module defines the document kinds handled by the reconciliation core, their workflow
//! statuses, and the header/draft structures exchanged with the HTTP layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::item::LineItem;
use crate::lenient;
use crate::policy::policy;
use crate::{DocumentId, UserId};

/// The kinds of documents whose lifecycle moves stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Credit note for a registered client.
    #[serde(rename = "avoirs_client")]
    AvoirClient,
    /// Credit note for a walk-in cash sale, identified by a free-text client name.
    #[serde(rename = "avoirs_comptant")]
    AvoirComptant,
    /// Credit note for an e-commerce order.
    #[serde(rename = "avoirs_ecommerce")]
    AvoirEcommerce,
}

impl DocumentKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 3] = [Self::AvoirClient, Self::AvoirComptant, Self::AvoirEcommerce];

    /// The path slug of the kind.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::AvoirClient => "avoirs_client",
            Self::AvoirComptant => "avoirs_comptant",
            Self::AvoirEcommerce => "avoirs_ecommerce",
        }
    }

    /// Human-readable label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AvoirClient => "Avoir client",
            Self::AvoirComptant => "Avoir comptant",
            Self::AvoirEcommerce => "Avoir ecommerce",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| CoreError::validation(format!("Type de document inconnu: {s}")))
    }
}

/// Workflow status of a document.
///
/// Only `Annule` carries stock semantics; every other status is informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statut {
    /// Draft.
    #[serde(rename = "Brouillon")]
    Brouillon,
    /// Waiting for validation.
    #[default]
    #[serde(rename = "En attente")]
    EnAttente,
    /// Validated.
    #[serde(rename = "Validé")]
    Valide,
    /// Applied to the client's balance.
    #[serde(rename = "Appliqué")]
    Applique,
    /// Delivered.
    #[serde(rename = "Livré")]
    Livre,
    /// Invoiced.
    #[serde(rename = "Facturé")]
    Facture,
    /// Cancelled: items do not affect stock.
    #[serde(rename = "Annulé")]
    Annule,
}

impl Statut {
    /// Every known status.
    pub const ALL: [Self; 7] = [
        Self::Brouillon,
        Self::EnAttente,
        Self::Valide,
        Self::Applique,
        Self::Livre,
        Self::Facture,
        Self::Annule,
    ];

    /// The stored label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Brouillon => "Brouillon",
            Self::EnAttente => "En attente",
            Self::Valide => "Validé",
            Self::Applique => "Appliqué",
            Self::Livre => "Livré",
            Self::Facture => "Facturé",
            Self::Annule => "Annulé",
        }
    }

    /// Whether the document's items are excluded from stock.
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Annule)
    }
}

impl fmt::Display for Statut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Statut {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|statut| statut.label() == s)
            .ok_or_else(|| CoreError::InvalidStatus(s.to_string()))
    }
}

/// Persisted header fields of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// Business date of the document.
    pub date_creation: NaiveDate,
    /// Registered client (client credit notes).
    pub client_id: Option<i64>,
    /// Free-text client name (cash credit notes).
    pub client_nom: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Loading place.
    pub lieu_chargement: Option<String>,
    /// Delivery address.
    pub adresse_livraison: Option<String>,
    /// Originating e-commerce order (e-commerce credit notes).
    pub ecommerce_order_id: Option<i64>,
    /// Customer email (e-commerce credit notes).
    pub customer_email: Option<String>,
    /// Document total.
    pub montant_total: Decimal,
    /// Workflow status.
    pub statut: Statut,
    /// Employee who created the document.
    pub created_by: UserId,
    /// Excluded from revenue calculations.
    #[serde(rename = "isNotCalculated")]
    pub is_not_calculated: Option<bool>,
}

/// A stored document with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Identifier within the kind.
    pub id: DocumentId,
    /// Document kind.
    pub kind: DocumentKind,
    /// Header fields.
    pub header: DocumentHeader,
    /// Line items in insertion order.
    pub items: Vec<LineItem>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// The display number: kind prefix followed by the id padded to two digits.
    #[must_use]
    pub fn numero(&self) -> String {
        numero(self.kind, self.id)
    }

    /// Current status.
    #[must_use]
    pub fn statut(&self) -> Statut {
        self.header.statut
    }
}

/// Display number of document `id` of `kind` (e.g. `AVCC07`).
#[must_use]
pub fn numero(kind: DocumentKind, id: DocumentId) -> String {
    format!("{}{:02}", policy(kind).numero_prefix, id.get())
}

/// A document as submitted by a form, before validation.
///
/// Every field is optional so that missing values surface as validation errors rather than
/// deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentDraft {
    /// Business date.
    #[serde(default)]
    pub date_creation: Option<NaiveDate>,
    /// Registered client.
    #[serde(default)]
    pub client_id: Option<i64>,
    /// Free-text client name.
    #[serde(default)]
    pub client_nom: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Loading place.
    #[serde(default)]
    pub lieu_chargement: Option<String>,
    /// Delivery address.
    #[serde(default)]
    pub adresse_livraison: Option<String>,
    /// Originating e-commerce order.
    #[serde(default)]
    pub ecommerce_order_id: Option<i64>,
    /// Customer email.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Document total.
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub montant_total: Option<Decimal>,
    /// Requested status label.
    #[serde(default)]
    pub statut: Option<String>,
    /// Creator.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub created_by: Option<UserId>,
    /// Revenue exclusion flag; only an explicit `true` is kept.
    #[serde(default, rename = "isNotCalculated")]
    pub is_not_calculated: Option<bool>,
    /// Line items.
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl DocumentDraft {
    /// Validate the draft for `kind`, using `fallback_statut` when none is given.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` when a required header field or item field is missing, a value
    ///   is out of range, or the kind requires lines and none are given.
    /// - `CoreError::InvalidStatus` when the status is unknown or not allowed for the kind.
    pub fn validate(
        self,
        kind: DocumentKind,
        fallback_statut: Statut,
    ) -> Result<(DocumentHeader, Vec<LineItem>)> {
        let (Some(date_creation), Some(montant_total), Some(created_by)) =
            (self.date_creation, self.montant_total, self.created_by)
        else {
            return Err(CoreError::validation("Champs requis manquants"));
        };

        if !lenient::fits_numeric(montant_total, 12, 2) {
            return Err(CoreError::validation("Montant total hors limites"));
        }

        let client_nom = self.client_nom.filter(|name| !name.trim().is_empty());
        if kind == DocumentKind::AvoirComptant && client_nom.is_none() {
            return Err(CoreError::validation("Champs requis manquants"));
        }

        let statut = match self.statut.as_deref() {
            Some(label) => {
                let statut = label.parse::<Statut>()?;
                policy(kind).ensure_allowed(statut)?;
                statut
            }
            None => fallback_statut,
        };

        if policy(kind).requires_items && self.items.is_empty() {
            return Err(CoreError::validation("Aucun item fourni"));
        }
        for item in &self.items {
            item.validate()?;
        }

        let header = DocumentHeader {
            date_creation,
            client_id: self.client_id,
            client_nom,
            phone: self.phone,
            lieu_chargement: self.lieu_chargement,
            adresse_livraison: self.adresse_livraison,
            ecommerce_order_id: self.ecommerce_order_id,
            customer_email: self.customer_email,
            montant_total,
            statut,
            created_by,
            is_not_calculated: self.is_not_calculated.filter(|flag| *flag),
        };

        Ok((header, self.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn draft(value: serde_json::Value) -> DocumentDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn statut_labels_roundtrip() {
        for statut in Statut::ALL {
            assert_eq!(statut.label().parse::<Statut>().unwrap(), statut);
            let json = serde_json::to_string(&statut).unwrap();
            assert_eq!(json, format!("\"{}\"", statut.label()));
        }
        assert!(matches!(
            "Perdu".parse::<Statut>(),
            Err(CoreError::InvalidStatus(_))
        ));
    }

    #[test]
    fn only_annule_is_cancelled() {
        let cancelled: Vec<_> = Statut::ALL.into_iter().filter(|s| s.is_cancelled()).collect();
        assert_eq!(cancelled, vec![Statut::Annule]);
    }

    #[test]
    fn numero_pads_to_two_digits() {
        assert_eq!(numero(DocumentKind::AvoirClient, DocumentId::new(7)), "AVC07");
        assert_eq!(numero(DocumentKind::AvoirComptant, DocumentId::new(123)), "AVCC123");
        assert_eq!(numero(DocumentKind::AvoirEcommerce, DocumentId::new(1)), "AVE01");
    }

    #[test]
    fn kind_slugs_parse() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.slug().parse::<DocumentKind>().unwrap(), kind);
        }
        assert!("bons".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn draft_requires_header_fields() {
        let err = draft(json!({ "montant_total": 10, "created_by": 1 }))
            .validate(DocumentKind::AvoirClient, Statut::EnAttente)
            .unwrap_err();
        assert_eq!(err, CoreError::validation("Champs requis manquants"));
    }

    #[test]
    fn cash_credit_note_requires_client_name() {
        let body = json!({ "date_creation": "2024-05-02", "montant_total": 10, "created_by": 1 });
        assert!(draft(body.clone())
            .validate(DocumentKind::AvoirClient, Statut::EnAttente)
            .is_ok());
        assert!(draft(body)
            .validate(DocumentKind::AvoirComptant, Statut::EnAttente)
            .is_err());
    }

    #[test]
    fn ecommerce_credit_note_requires_items() {
        let body = json!({ "date_creation": "2024-05-02", "montant_total": 10, "created_by": 1 });
        let err = draft(body)
            .validate(DocumentKind::AvoirEcommerce, Statut::EnAttente)
            .unwrap_err();
        assert_eq!(err, CoreError::validation("Aucun item fourni"));
    }

    #[test]
    fn draft_rejects_status_outside_kind() {
        let err = draft(json!({
            "date_creation": "2024-05-02",
            "montant_total": 10,
            "created_by": 1,
            "statut": "Livré"
        }))
        .validate(DocumentKind::AvoirClient, Statut::EnAttente)
        .unwrap_err();
        assert_eq!(err, CoreError::InvalidStatus("Livré".into()));
    }

    #[test]
    fn draft_defaults_status_and_filters_flag() {
        let (header, items) = draft(json!({
            "date_creation": "2024-05-02",
            "montant_total": "30",
            "created_by": "4",
            "isNotCalculated": false,
            "items": [{ "product_id": 5, "quantite": 3, "prix_unitaire": 10, "total": 30 }]
        }))
        .validate(DocumentKind::AvoirClient, Statut::EnAttente)
        .unwrap();

        assert_eq!(header.statut, Statut::EnAttente);
        assert_eq!(header.montant_total, dec!(30));
        assert_eq!(header.created_by, UserId::new(4));
        assert_eq!(header.is_not_calculated, None);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn draft_rejects_oversized_values() {
        let line = json!({
            "product_id": 5,
            "quantite": "79228162514264337593543950335",
            "prix_unitaire": 10,
            "total": 10
        });
        let err = draft(json!({
            "date_creation": "2024-05-02",
            "montant_total": 10,
            "created_by": 1,
            "items": [line.clone(), line]
        }))
        .validate(DocumentKind::AvoirClient, Statut::EnAttente)
        .unwrap_err();
        assert_eq!(err, CoreError::validation("Item invalide: valeur hors limites"));

        let err = draft(json!({
            "date_creation": "2024-05-02",
            "montant_total": "10000000000",
            "created_by": 1
        }))
        .validate(DocumentKind::AvoirClient, Statut::EnAttente)
        .unwrap_err();
        assert_eq!(err, CoreError::validation("Montant total hors limites"));
    }
}
