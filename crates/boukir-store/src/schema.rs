//! Table layout of each document kind.
//!
//! Every kind stores a header row and item rows keyed by a foreign key. The tables differ only
//! by name and by the column names of a few header fields, so the SQL backend builds its
//! statements from this table instead of carrying one set of queries per kind.

use boukir_core::DocumentKind;

/// Where a document kind lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTables {
    /// Header table.
    pub header: &'static str,
    /// Item table.
    pub items: &'static str,
    /// Column of the item table referencing the header.
    pub foreign_key: &'static str,
    /// Column holding the free-text client name.
    pub client_name: &'static str,
    /// Column holding the contact phone.
    pub phone: &'static str,
}

const TABLES: [DocumentTables; 3] = [
    DocumentTables {
        header: "avoirs_client",
        items: "avoir_client_items",
        foreign_key: "avoir_client_id",
        client_name: "client_nom",
        phone: "phone",
    },
    DocumentTables {
        header: "avoirs_comptant",
        items: "avoir_comptant_items",
        foreign_key: "avoir_comptant_id",
        client_name: "client_nom",
        phone: "phone",
    },
    DocumentTables {
        header: "avoirs_ecommerce",
        items: "avoir_ecommerce_items",
        foreign_key: "avoir_ecommerce_id",
        client_name: "customer_name",
        phone: "customer_phone",
    },
];

/// Look up the tables of `kind`.
#[must_use]
pub fn tables(kind: DocumentKind) -> &'static DocumentTables {
    match kind {
        DocumentKind::AvoirClient => &TABLES[0],
        DocumentKind::AvoirComptant => &TABLES[1],
        DocumentKind::AvoirEcommerce => &TABLES[2],
    }
}

/// Product table and its columns touched by stock moves.
pub mod products {
    /// Table name.
    pub const TABLE: &str = "products";
    /// Purchase price.
    pub const PRIX_ACHAT: &str = "prix_achat";
    /// Cost price.
    pub const COUT_REVIENT: &str = "cout_revient";
}

/// Variant table.
pub mod variants {
    /// Table name.
    pub const TABLE: &str = "product_variants";
    /// Stock column of a variant.
    pub const STOCK: &str = "stock_quantity";
}

/// Product snapshot (stock lot) table.
pub mod snapshots {
    /// Table name.
    pub const TABLE: &str = "product_snapshot";
    /// Quantity left in the lot.
    pub const STOCK: &str = "quantite";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_own_tables() {
        let headers: Vec<_> = DocumentKind::ALL.iter().map(|k| tables(*k).header).collect();
        assert_eq!(headers, vec!["avoirs_client", "avoirs_comptant", "avoirs_ecommerce"]);
        for kind in DocumentKind::ALL {
            assert_eq!(tables(kind).header, kind.slug());
        }
    }

    #[test]
    fn ecommerce_uses_customer_columns() {
        let t = tables(DocumentKind::AvoirEcommerce);
        assert_eq!(t.client_name, "customer_name");
        assert_eq!(t.foreign_key, "avoir_ecommerce_id");
    }
}
