//! In-memory backend.
//!
//! A transaction holds the state lock for its whole lifetime and works on a copy of the
//! state; `commit` swaps the copy in. Dropping the transaction discards the copy, which gives
//! the same all-or-nothing behavior as a database rollback.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use boukir_core::{
    DeltaKey, Document, DocumentHeader, DocumentId, DocumentKind, LineItem, ProductId,
    SnapshotId, StockColumn, Statut, UserId, VariantId,
};

use crate::error::{Result, StoreError};
use crate::{Database, ProductSnapshot, ProductStock, StockTx, VariantStock};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_ids: BTreeMap<DocumentKind, i64>,
    documents: BTreeMap<(DocumentKind, DocumentId), Document>,
    products: BTreeMap<ProductId, ProductStock>,
    variants: BTreeMap<VariantId, VariantStock>,
    snapshots: BTreeMap<SnapshotId, ProductSnapshot>,
}

impl MemoryState {
    /// Attach product prices to items, as the SQL backend does with a join.
    fn with_prices(&self, mut document: Document) -> Document {
        for item in &mut document.items {
            let product = item.product_id.and_then(|id| self.products.get(&id));
            item.prix_achat = product.and_then(|p| p.prix_achat);
            item.cout_revient = product.and_then(|p| p.cout_revient);
        }
        document
    }

    fn document(&self, kind: DocumentKind, id: DocumentId) -> Option<Document> {
        self.documents
            .get(&(kind, id))
            .cloned()
            .map(|document| self.with_prices(document))
    }

    fn document_mut(&mut self, kind: DocumentKind, id: DocumentId) -> Result<&mut Document> {
        self.documents
            .get_mut(&(kind, id))
            .ok_or_else(|| StoreError::not_found(kind.slug(), id))
    }
}

fn moved(level: Decimal, delta: Decimal) -> Result<Decimal> {
    level
        .checked_add(delta)
        .ok_or_else(|| StoreError::Invalid("Stock hors limites".into()))
}

fn stored_items(items: &[LineItem]) -> Vec<LineItem> {
    items
        .iter()
        .map(|item| LineItem {
            prix_achat: None,
            cout_revient: None,
            ..item.clone()
        })
        .collect()
}

/// In-memory database.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product row.
    pub async fn put_product(&self, product: ProductStock) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Insert or replace a variant row.
    pub async fn put_variant(&self, variant: VariantStock) {
        self.state.lock().await.variants.insert(variant.id, variant);
    }

    /// Insert or replace a product snapshot row.
    pub async fn put_snapshot(&self, snapshot: ProductSnapshot) {
        self.state.lock().await.snapshots.insert(snapshot.id, snapshot);
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn list_documents(&self, kind: DocumentKind) -> Result<Vec<Document>> {
        let state = self.state.lock().await;
        let mut documents: Vec<Document> = state
            .documents
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, document)| state.with_prices(document.clone()))
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(documents)
    }

    async fn get_document(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.state.lock().await.document(kind, id))
    }

    async fn product_stock(&self, id: ProductId) -> Result<Option<ProductStock>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn variant_stock(&self, id: VariantId) -> Result<Option<VariantStock>> {
        Ok(self.state.lock().await.variants.get(&id).cloned())
    }

    async fn product_snapshot(&self, id: SnapshotId) -> Result<Option<ProductSnapshot>> {
        Ok(self.state.lock().await.snapshots.get(&id).cloned())
    }
}

/// Transaction of the in-memory backend.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StockTx for MemoryTx {
    async fn lock_document(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Option<Document>> {
        Ok(self.working.document(kind, id))
    }

    async fn insert_document(
        &mut self,
        kind: DocumentKind,
        header: &DocumentHeader,
        items: &[LineItem],
    ) -> Result<DocumentId> {
        let last = self.working.last_ids.entry(kind).or_insert(0);
        *last += 1;
        let id = DocumentId::new(*last);
        let now = Utc::now();
        self.working.documents.insert(
            (kind, id),
            Document {
                id,
                kind,
                header: header.clone(),
                items: stored_items(items),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_header(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        header: &DocumentHeader,
    ) -> Result<()> {
        let document = self.working.document_mut(kind, id)?;
        document.header = header.clone();
        document.updated_at = Utc::now();
        Ok(())
    }

    async fn set_status(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        statut: Statut,
    ) -> Result<()> {
        let document = self.working.document_mut(kind, id)?;
        document.header.statut = statut;
        document.updated_at = Utc::now();
        Ok(())
    }

    async fn replace_items(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        items: &[LineItem],
    ) -> Result<()> {
        self.working.document_mut(kind, id)?.items = stored_items(items);
        Ok(())
    }

    async fn delete_document(&mut self, kind: DocumentKind, id: DocumentId) -> Result<()> {
        self.working
            .documents
            .remove(&(kind, id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(kind.slug(), id))
    }

    async fn lock_stock(&mut self, keys: &[DeltaKey]) -> Result<()> {
        for key in keys {
            match key.variant_id {
                Some(variant) if !self.working.variants.contains_key(&variant) => {
                    return Err(StoreError::not_found("variant", variant));
                }
                None if !self.working.products.contains_key(&key.product_id) => {
                    return Err(StoreError::not_found("product", key.product_id));
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn increment_stock(
        &mut self,
        column: StockColumn,
        key: DeltaKey,
        delta: Decimal,
        acting_user: Option<UserId>,
    ) -> Result<()> {
        let now = Utc::now();
        if let Some(variant_id) = key.variant_id {
            let variant = self
                .working
                .variants
                .get_mut(&variant_id)
                .ok_or_else(|| StoreError::not_found("variant", variant_id))?;
            variant.stock_quantity = moved(variant.stock_quantity, delta)?;
            variant.updated_at = Some(now);
            return Ok(());
        }

        let product = self
            .working
            .products
            .get_mut(&key.product_id)
            .ok_or_else(|| StoreError::not_found("product", key.product_id))?;
        match column {
            StockColumn::Shared => product.quantite = moved(product.quantite, delta)?,
            StockColumn::Ecommerce => {
                product.stock_partage_ecom_qty = moved(product.stock_partage_ecom_qty, delta)?;
            }
        }
        product.updated_by = acting_user;
        product.updated_at = Some(now);
        Ok(())
    }

    async fn lock_snapshots(&mut self, ids: &[SnapshotId]) -> Result<()> {
        match ids.iter().find(|id| !self.working.snapshots.contains_key(*id)) {
            Some(missing) => Err(StoreError::not_found("product snapshot", *missing)),
            None => Ok(()),
        }
    }

    async fn adjust_snapshot(&mut self, id: SnapshotId, delta: Decimal) -> Result<()> {
        let snapshot = self
            .working
            .snapshots
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("product snapshot", id))?;
        snapshot.quantite = moved(snapshot.quantite, delta)?.max(Decimal::ZERO);
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key(product: i64) -> DeltaKey {
        DeltaKey::product(ProductId::new(product))
    }

    async fn seeded() -> MemoryDatabase {
        let db = MemoryDatabase::new();
        db.put_product(ProductStock::new(ProductId::new(5), dec!(10), dec!(4)))
            .await;
        db
    }

    #[tokio::test]
    async fn dropped_transaction_changes_nothing() {
        let db = seeded().await;
        {
            let mut tx = db.begin().await.unwrap();
            tx.increment_stock(StockColumn::Shared, key(5), dec!(3), None)
                .await
                .unwrap();
        }
        let product = db.product_stock(ProductId::new(5)).await.unwrap().unwrap();
        assert_eq!(product.quantite, dec!(10));
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let db = seeded().await;
        let mut tx = db.begin().await.unwrap();
        tx.increment_stock(StockColumn::Ecommerce, key(5), dec!(2), Some(UserId::new(7)))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let product = db.product_stock(ProductId::new(5)).await.unwrap().unwrap();
        assert_eq!(product.quantite, dec!(10));
        assert_eq!(product.stock_partage_ecom_qty, dec!(6));
        assert_eq!(product.updated_by, Some(UserId::new(7)));
    }

    #[tokio::test]
    async fn locking_unknown_rows_fails() {
        let db = seeded().await;
        let mut tx = db.begin().await.unwrap();
        let err = tx.lock_stock(&[key(5), key(6)]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn snapshot_quantities_floor_at_zero() {
        let db = seeded().await;
        db.put_snapshot(ProductSnapshot::new(SnapshotId::new(3), ProductId::new(5), dec!(2)))
            .await;

        let mut tx = db.begin().await.unwrap();
        tx.lock_snapshots(&[SnapshotId::new(3)]).await.unwrap();
        tx.adjust_snapshot(SnapshotId::new(3), dec!(-5)).await.unwrap();
        tx.commit().await.unwrap();

        let lot = db.product_snapshot(SnapshotId::new(3)).await.unwrap().unwrap();
        assert_eq!(lot.quantite, Decimal::ZERO);

        let mut tx = db.begin().await.unwrap();
        let err = tx.lock_snapshots(&[SnapshotId::new(4)]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
