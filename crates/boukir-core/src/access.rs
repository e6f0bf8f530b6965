//! Role rules for document operations.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::{DocumentHeader, Statut};
use crate::error::{CoreError, Result};
use crate::item::LineItem;
use crate::lenient;
use crate::UserId;

/// Back-office role, as carried by the JWT `role` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Company head; may validate anything.
    Pdg,
    /// Senior manager; may validate credit notes.
    ManagerPlus,
    /// Manager.
    Manager,
    /// Lead driver; may only adjust quantities and cancel.
    ChefChauffeur,
    /// Regular employee.
    Employe,
    /// Any role this service has no rule for.
    Other(String),
}

impl Role {
    /// Whether the role may move a credit note to `Validé`.
    #[must_use]
    pub fn can_validate(&self) -> bool {
        matches!(self, Self::Pdg | Self::ManagerPlus)
    }

    /// The role name as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pdg => "PDG",
            Self::ManagerPlus => "ManagerPlus",
            Self::Manager => "Manager",
            Self::ChefChauffeur => "ChefChauffeur",
            Self::Employe => "Employé",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PDG" => Self::Pdg,
            "ManagerPlus" => Self::ManagerPlus,
            "Manager" => Self::Manager,
            "ChefChauffeur" => Self::ChefChauffeur,
            "Employé" | "Employe" => Self::Employe,
            _ => Self::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Employee id, when the token carried one.
    pub user_id: Option<UserId>,
    /// Role.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(user_id: Option<UserId>, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the actor is a lead driver.
    #[must_use]
    pub fn is_driver(&self) -> bool {
        self.role == Role::ChefChauffeur
    }

    /// The id recorded on stock rows: the actor, else the document's creator.
    ///
    /// Never fails; a stock move without a known author is still applied.
    #[must_use]
    pub fn stock_author(&self, created_by: Option<UserId>) -> Option<UserId> {
        self.user_id.or(created_by)
    }
}

/// Check that `actor` may create documents.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` for lead drivers.
pub fn check_create(actor: &Actor) -> Result<()> {
    if actor.is_driver() {
        return Err(CoreError::forbidden("Accès refusé"));
    }
    Ok(())
}

/// Check that `actor` may edit a document currently in `statut`.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` when a lead driver edits a validated or cancelled document.
pub fn check_update(actor: &Actor, statut: Statut) -> Result<()> {
    if actor.is_driver() && matches!(statut, Statut::Valide | Statut::Annule) {
        return Err(CoreError::forbidden(
            "Accès refusé: modification interdite sur un avoir validé/annulé",
        ));
    }
    Ok(())
}

/// Check that `actor` may move a document from `old` to `new`.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` when the role does not allow the transition.
pub fn check_status_change(actor: &Actor, old: Statut, new: Statut) -> Result<()> {
    if actor.is_driver() {
        if old == Statut::Valide {
            return Err(CoreError::forbidden("Accès refusé: avoir déjà validé"));
        }
        if !matches!(new, Statut::EnAttente | Statut::Annule) {
            return Err(CoreError::forbidden(
                "Accès refusé: Chef Chauffeur peut seulement En attente / Annulé",
            ));
        }
        return Ok(());
    }
    if new == Statut::Valide && !actor.role.can_validate() {
        return Err(CoreError::forbidden("Rôle PDG requis pour valider"));
    }
    Ok(())
}

/// Restrict a lead driver's edit to quantity changes on the existing lines.
///
/// The incoming lines must match the stored ones position by position (same product,
/// variant and unit). Prices and discounts are taken from the stored lines, totals are
/// recomputed, and the header is kept except for the recomputed document total.
///
/// # Errors
///
/// - `CoreError::Validation` when there are no stored lines, a quantity is not positive or
///   too large, or a recomputed total does not fit an amount column.
/// - `CoreError::Forbidden` when lines are added, removed or swapped.
pub fn restrict_driver_edit(
    stored_header: &DocumentHeader,
    stored_items: &[LineItem],
    incoming: &[LineItem],
) -> Result<(DocumentHeader, Vec<LineItem>)> {
    if stored_items.is_empty() {
        return Err(CoreError::validation("Avoir invalide: aucun item existant"));
    }
    if incoming.len() != stored_items.len() {
        return Err(CoreError::forbidden(
            "Accès refusé: modification des lignes interdite (ajout/suppression)",
        ));
    }

    let mut items = Vec::with_capacity(stored_items.len());
    for (stored, requested) in stored_items.iter().zip(incoming) {
        if !stored.same_line_as(requested) {
            return Err(CoreError::forbidden(
                "Accès refusé: modification des produits/variantes/unités interdite",
            ));
        }
        let quantite = requested
            .quantite
            .filter(|q| *q > Decimal::ZERO && lenient::fits_numeric(*q, 12, 3))
            .ok_or_else(|| CoreError::validation("Quantité invalide"))?;
        let prix_unitaire = stored.prix_unitaire.unwrap_or(Decimal::ZERO);
        let total = quantite
            .checked_mul(prix_unitaire)
            .filter(|total| lenient::fits_numeric(*total, 12, 2))
            .ok_or_else(out_of_range)?;
        items.push(LineItem {
            quantite: Some(quantite),
            prix_unitaire: Some(prix_unitaire),
            total: Some(total),
            prix_achat: None,
            cout_revient: None,
            ..stored.clone()
        });
    }

    let montant_total = items
        .iter()
        .filter_map(|item| item.total)
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .filter(|total| lenient::fits_numeric(*total, 12, 2))
        .ok_or_else(out_of_range)?;
    let mut header = stored_header.clone();
    header.montant_total = montant_total;
    Ok((header, items))
}

fn out_of_range() -> CoreError {
    CoreError::validation("Montant hors limites")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProductId, VariantId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn driver() -> Actor {
        Actor::new(Some(UserId::new(2)), Role::ChefChauffeur)
    }

    fn header() -> DocumentHeader {
        DocumentHeader {
            date_creation: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            client_id: Some(3),
            client_nom: None,
            phone: None,
            lieu_chargement: None,
            adresse_livraison: None,
            ecommerce_order_id: None,
            customer_email: None,
            montant_total: dec!(30),
            statut: Statut::EnAttente,
            created_by: UserId::new(1),
            is_not_calculated: None,
        }
    }

    fn priced(product: i64, variant: Option<i64>, qty: Decimal, price: Decimal) -> LineItem {
        LineItem {
            prix_unitaire: Some(price),
            total: Some(qty * price),
            ..LineItem::stock_line(ProductId::new(product), variant.map(VariantId::new), qty)
        }
    }

    #[test]
    fn roles_parse_from_claims() {
        assert_eq!(Role::from("PDG".to_string()), Role::Pdg);
        assert_eq!(Role::from("Employé".to_string()), Role::Employe);
        assert_eq!(
            Role::from("Comptable".to_string()),
            Role::Other("Comptable".into())
        );
        assert_eq!(String::from(Role::ManagerPlus), "ManagerPlus");
    }

    #[test]
    fn drivers_cannot_create() {
        assert!(check_create(&driver()).is_err());
        assert!(check_create(&Actor::new(None, Role::Employe)).is_ok());
    }

    #[test]
    fn drivers_cannot_edit_validated_documents() {
        assert!(check_update(&driver(), Statut::Valide).is_err());
        assert!(check_update(&driver(), Statut::Annule).is_err());
        assert!(check_update(&driver(), Statut::EnAttente).is_ok());
        assert!(check_update(&Actor::new(None, Role::Manager), Statut::Valide).is_ok());
    }

    #[test]
    fn validation_requires_pdg_or_manager_plus() {
        let manager = Actor::new(None, Role::Manager);
        assert!(check_status_change(&manager, Statut::EnAttente, Statut::Valide).is_err());
        assert!(check_status_change(&manager, Statut::EnAttente, Statut::Annule).is_ok());
        let pdg = Actor::new(None, Role::Pdg);
        assert!(check_status_change(&pdg, Statut::EnAttente, Statut::Valide).is_ok());
    }

    #[test]
    fn drivers_may_only_hold_or_cancel() {
        assert!(check_status_change(&driver(), Statut::EnAttente, Statut::Annule).is_ok());
        assert!(check_status_change(&driver(), Statut::Annule, Statut::EnAttente).is_ok());
        assert!(check_status_change(&driver(), Statut::EnAttente, Statut::Applique).is_err());
        assert!(check_status_change(&driver(), Statut::Valide, Statut::Annule).is_err());
    }

    #[test]
    fn stock_author_falls_back_to_creator() {
        let anonymous = Actor::new(None, Role::Pdg);
        assert_eq!(
            anonymous.stock_author(Some(UserId::new(9))),
            Some(UserId::new(9))
        );
        assert_eq!(anonymous.stock_author(None), None);
        assert_eq!(driver().stock_author(Some(UserId::new(9))), Some(UserId::new(2)));
    }

    #[test]
    fn driver_edit_keeps_prices_and_recomputes_totals() {
        let stored = vec![
            priced(5, None, dec!(3), dec!(10)),
            priced(6, Some(1), dec!(1), dec!(4)),
        ];
        let incoming = vec![
            priced(5, None, dec!(2), dec!(999)),
            priced(6, Some(1), dec!(1), dec!(0)),
        ];

        let (header, items) = restrict_driver_edit(&header(), &stored, &incoming).unwrap();

        assert_eq!(items[0].quantite, Some(dec!(2)));
        assert_eq!(items[0].prix_unitaire, Some(dec!(10)));
        assert_eq!(items[0].total, Some(dec!(20)));
        assert_eq!(header.montant_total, dec!(24));
        assert_eq!(header.client_id, Some(3));
    }

    #[test]
    fn driver_edit_rejects_line_changes() {
        let stored = vec![priced(5, None, dec!(3), dec!(10))];

        let added = vec![
            priced(5, None, dec!(3), dec!(10)),
            priced(7, None, dec!(1), dec!(10)),
        ];
        assert!(matches!(
            restrict_driver_edit(&header(), &stored, &added),
            Err(CoreError::Forbidden(_))
        ));

        let swapped = vec![priced(7, None, dec!(3), dec!(10))];
        assert!(matches!(
            restrict_driver_edit(&header(), &stored, &swapped),
            Err(CoreError::Forbidden(_))
        ));

        let zero = vec![priced(5, None, Decimal::ZERO, dec!(10))];
        assert!(matches!(
            restrict_driver_edit(&header(), &stored, &zero),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn driver_edit_rejects_oversized_quantities() {
        let stored = vec![
            priced(5, None, dec!(3), dec!(10)),
            priced(5, None, dec!(1), dec!(10)),
        ];
        let huge = Decimal::MAX;
        let incoming = vec![
            priced(5, None, huge, dec!(10)),
            priced(5, None, huge, dec!(10)),
        ];
        assert!(matches!(
            restrict_driver_edit(&header(), &stored, &incoming),
            Err(CoreError::Validation(_))
        ));

        let incoming = vec![
            priced(5, None, dec!(999999999), dec!(10)),
            priced(5, None, dec!(1), dec!(10)),
        ];
        let err = restrict_driver_edit(&header(), &stored, &incoming).unwrap_err();
        assert_eq!(err.to_string(), "Montant hors limites");
    }
}
