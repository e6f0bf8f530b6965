//! Transactional storage for Boukir documents and stock.
//!
//! This crate executes document lifecycle operations against a database, one transaction per
//! operation, and applies the resulting stock deltas inside that same transaction.
//!
//! # Architecture
//!
//! - [`Database`] / [`StockTx`]: the backend seam. A backend opens transactions that can lock a
//!   document row, rewrite it, and move stock.
//! - [`PgDatabase`]: PostgreSQL backend (sqlx).
//! - [`MemoryDatabase`]: in-memory backend for tests and local runs.
//! - [`stock::apply_deltas`]: the delta applier, for stock rows and snapshot lots.
//! - [`DocumentLedger`]: runs every operation as one locked read-modify-write and implements
//!   the object-safe [`DocumentStore`] used by the HTTP layer.
//!
//! # Example
//!
//! ```no_run
//! use boukir_core::{Actor, DocumentDraft, DocumentKind, Role};
//! use boukir_store::{DocumentLedger, DocumentStore, MemoryDatabase};
//!
//! # async fn run(draft: DocumentDraft) -> boukir_store::Result<()> {
//! let ledger = DocumentLedger::new(MemoryDatabase::new());
//! let actor = Actor::new(None, Role::Pdg);
//! let document = ledger.create(&actor, DocumentKind::AvoirComptant, draft).await?;
//! println!("created {}", document.numero());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod stock;

pub use error::{Result, StoreError};
pub use ledger::DocumentLedger;
pub use memory::MemoryDatabase;
pub use postgres::{PgConfig, PgDatabase};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use boukir_core::{
    Actor, DeltaKey, Document, DocumentDraft, DocumentHeader, DocumentId, DocumentKind, LineItem,
    ProductId, SnapshotId, StockColumn, Statut, Transition, UserId, VariantId,
};

/// Stock levels of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductStock {
    /// Product id.
    pub id: ProductId,
    /// Shop stock.
    pub quantite: Decimal,
    /// Stock shared with the e-commerce front.
    pub stock_partage_ecom_qty: Decimal,
    /// Purchase price.
    pub prix_achat: Option<Decimal>,
    /// Cost price.
    pub cout_revient: Option<Decimal>,
    /// Last employee who moved the stock.
    pub updated_by: Option<UserId>,
    /// Last update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductStock {
    /// A product with the given stock levels and no prices.
    #[must_use]
    pub fn new(id: ProductId, quantite: Decimal, stock_partage_ecom_qty: Decimal) -> Self {
        Self {
            id,
            quantite,
            stock_partage_ecom_qty,
            prix_achat: None,
            cout_revient: None,
            updated_by: None,
            updated_at: None,
        }
    }

    /// The level held in `column`.
    #[must_use]
    pub fn level(&self, column: StockColumn) -> Decimal {
        match column {
            StockColumn::Shared => self.quantite,
            StockColumn::Ecommerce => self.stock_partage_ecom_qty,
        }
    }
}

/// Stock level of a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantStock {
    /// Variant id.
    pub id: VariantId,
    /// Owning product.
    pub product_id: ProductId,
    /// Variant stock.
    pub stock_quantity: Decimal,
    /// Last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A product snapshot: a stock lot recorded at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSnapshot {
    /// Snapshot id.
    pub id: SnapshotId,
    /// Product of the lot.
    pub product_id: ProductId,
    /// Variant of the lot, if any.
    pub variant_id: Option<VariantId>,
    /// Sale price recorded with the lot.
    pub prix_vente: Option<Decimal>,
    /// Quantity left in the lot, never negative.
    pub quantite: Decimal,
}

impl ProductSnapshot {
    /// A lot of `product_id` holding `quantite`.
    #[must_use]
    pub fn new(id: SnapshotId, product_id: ProductId, quantite: Decimal) -> Self {
        Self {
            id,
            product_id,
            variant_id: None,
            prix_vente: None,
            quantite,
        }
    }
}

/// Outcome of a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// The document after the change.
    pub document: Document,
    /// How the change related to the cancelled state.
    pub transition: Transition,
    /// `false` when the document already had the requested status.
    pub changed: bool,
}

/// A database backend.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Transaction handle of the backend.
    type Tx: StockTx;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired.
    async fn begin(&self) -> Result<Self::Tx>;

    /// List documents of `kind`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_documents(&self, kind: DocumentKind) -> Result<Vec<Document>>;

    /// Read one document without locking it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_document(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>>;

    /// Read a product's stock levels.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn product_stock(&self, id: ProductId) -> Result<Option<ProductStock>>;

    /// Read a variant's stock level.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn variant_stock(&self, id: VariantId) -> Result<Option<VariantStock>>;

    /// Read a product snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn product_snapshot(&self, id: SnapshotId) -> Result<Option<ProductSnapshot>>;
}

/// An open transaction.
///
/// Dropping the handle without calling [`StockTx::commit`] rolls every change back.
#[async_trait]
pub trait StockTx: Send {
    /// Read a document and its items, holding a row lock until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn lock_document(&mut self, kind: DocumentKind, id: DocumentId)
        -> Result<Option<Document>>;

    /// Insert a document with its items and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_document(
        &mut self,
        kind: DocumentKind,
        header: &DocumentHeader,
        items: &[LineItem],
    ) -> Result<DocumentId>;

    /// Overwrite a document's header, status included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_header(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        header: &DocumentHeader,
    ) -> Result<()>;

    /// Set a document's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn set_status(&mut self, kind: DocumentKind, id: DocumentId, statut: Statut)
        -> Result<()>;

    /// Replace all items of a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn replace_items(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        items: &[LineItem],
    ) -> Result<()>;

    /// Delete a document and its items.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_document(&mut self, kind: DocumentKind, id: DocumentId) -> Result<()>;

    /// Lock the stock rows behind `keys` (product rows, then variant rows, each by id).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if a product or variant row does not exist.
    async fn lock_stock(&mut self, keys: &[DeltaKey]) -> Result<()>;

    /// Add `delta` to the stock behind `key`.
    ///
    /// Variant keys move the variant's stock; product keys move `column` and record
    /// `acting_user` as the author.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row does not exist.
    async fn increment_stock(
        &mut self,
        column: StockColumn,
        key: DeltaKey,
        delta: Decimal,
        acting_user: Option<UserId>,
    ) -> Result<()>;

    /// Lock the snapshot rows behind `ids`, in id order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if a snapshot row does not exist.
    async fn lock_snapshots(&mut self, ids: &[SnapshotId]) -> Result<()>;

    /// Add `delta` to a snapshot's quantity, flooring the result at zero.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row does not exist.
    async fn adjust_snapshot(&mut self, id: SnapshotId, delta: Decimal) -> Result<()>;

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is written in that case.
    async fn commit(self) -> Result<()>;
}

/// The document operations exposed to the HTTP layer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list(&self, kind: DocumentKind) -> Result<Vec<Document>>;

    /// Get one document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if it does not exist.
    async fn get(&self, kind: DocumentKind, id: DocumentId) -> Result<Document>;

    /// Create a document and apply its stock effect.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `Invalid` before anything is written, or a persistence error
    /// after which nothing is written.
    async fn create(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        draft: DocumentDraft,
    ) -> Result<Document>;

    /// Replace a document's header and items, applying the net stock difference.
    ///
    /// A replacement that changes the status is subject to the same role rules as
    /// [`DocumentStore::change_status`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden`, `Invalid` or a persistence error; the document and
    /// stock are unchanged in every case.
    async fn update(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        id: DocumentId,
        draft: DocumentDraft,
    ) -> Result<Document>;

    /// Move a document to the status labelled `statut`.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a missing or unknown status, `NotFound`, `Forbidden`, or a
    /// persistence error; the document and stock are unchanged in every case.
    async fn change_status(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        id: DocumentId,
        statut: Option<&str>,
    ) -> Result<StatusChange>;

    /// Delete a document, removing its stock effect.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a persistence error.
    async fn delete(&self, actor: &Actor, kind: DocumentKind, id: DocumentId) -> Result<()>;

    /// Read a product's stock levels.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product does not exist.
    async fn product_stock(&self, id: ProductId) -> Result<ProductStock>;

    /// Read a variant's stock level.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the variant does not exist.
    async fn variant_stock(&self, id: VariantId) -> Result<VariantStock>;

    /// Read a product snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the snapshot does not exist.
    async fn product_snapshot(&self, id: SnapshotId) -> Result<ProductSnapshot>;
}
