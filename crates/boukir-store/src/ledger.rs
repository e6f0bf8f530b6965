//! Document lifecycle operations.
//!
//! Every mutating operation follows the same shape: open a transaction, lock the stored
//! document, check the actor's rights against the locked state, plan the net stock effect,
//! write the document, apply the effect, commit. Any error before `commit` drops the
//! transaction, which rolls back the document and stock writes together.

use async_trait::async_trait;
use tracing::{info, warn};

use boukir_core::access::{self, restrict_driver_edit};
use boukir_core::lifecycle::{on_create, on_delete, on_status_change, on_update};
use boukir_core::{
    policy, Actor, Document, DocumentDraft, DocumentId, DocumentKind, ProductId, SnapshotId,
    Statut, Transition, VariantId,
};

use crate::error::{Result, StoreError};
use crate::stock::apply_deltas;
use crate::{
    Database, DocumentStore, ProductSnapshot, ProductStock, StatusChange, StockTx, VariantStock,
};

/// Runs document operations against a [`Database`].
#[derive(Debug, Clone)]
pub struct DocumentLedger<D> {
    db: D,
}

impl<D: Database> DocumentLedger<D> {
    /// Create a ledger over `db`.
    #[must_use]
    pub fn new(db: D) -> Self {
        Self { db }
    }
}

async fn locked<T: StockTx>(tx: &mut T, kind: DocumentKind, id: DocumentId) -> Result<Document> {
    tx.lock_document(kind, id)
        .await?
        .ok_or_else(|| StoreError::not_found(kind.slug(), id))
}

fn parse_statut(kind: DocumentKind, label: Option<&str>) -> Result<Statut> {
    let label = label
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .ok_or_else(|| StoreError::Invalid("Statut requis".to_string()))?;
    let statut = label.parse::<Statut>()?;
    policy(kind).ensure_allowed(statut)?;
    Ok(statut)
}

fn rejected(kind: DocumentKind, err: StoreError) -> StoreError {
    if matches!(err, StoreError::Forbidden(_) | StoreError::Invalid(_)) {
        warn!(kind = %kind, error = %err, "document operation rejected");
    }
    err
}

#[async_trait]
impl<D: Database> DocumentStore for DocumentLedger<D> {
    async fn list(&self, kind: DocumentKind) -> Result<Vec<Document>> {
        self.db.list_documents(kind).await
    }

    async fn get(&self, kind: DocumentKind, id: DocumentId) -> Result<Document> {
        self.db
            .get_document(kind, id)
            .await?
            .ok_or_else(|| StoreError::not_found(kind.slug(), id))
    }

    async fn create(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        draft: DocumentDraft,
    ) -> Result<Document> {
        access::check_create(actor).map_err(|e| rejected(kind, e.into()))?;
        let (header, items) = draft
            .validate(kind, Statut::default())
            .map_err(|e| rejected(kind, e.into()))?;

        let policy = policy(kind);
        let effect = on_create(policy, header.statut, &items);
        let author = actor.stock_author(Some(header.created_by));

        let mut tx = self.db.begin().await?;
        let id = tx.insert_document(kind, &header, &items).await?;
        apply_deltas(&mut tx, policy.column, &effect, author).await?;
        let document = locked(&mut tx, kind, id).await?;
        tx.commit().await?;

        info!(
            kind = %kind,
            document_id = %id,
            statut = %header.statut,
            keys = effect.stock.len(),
            snapshots = effect.snapshots.len(),
            "document created"
        );
        Ok(document)
    }

    async fn update(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        id: DocumentId,
        draft: DocumentDraft,
    ) -> Result<Document> {
        let policy = policy(kind);
        let mut tx = self.db.begin().await?;
        let stored = locked(&mut tx, kind, id).await?;

        access::check_update(actor, stored.statut()).map_err(|e| rejected(kind, e.into()))?;
        let (header, items) = if actor.is_driver() {
            restrict_driver_edit(&stored.header, &stored.items, &draft.items)
        } else {
            draft.validate(kind, stored.statut())
        }
        .map_err(|e| rejected(kind, e.into()))?;
        if header.statut != stored.statut() {
            access::check_status_change(actor, stored.statut(), header.statut)
                .map_err(|e| rejected(kind, e.into()))?;
        }

        let effect = on_update(
            policy,
            stored.statut(),
            &stored.items,
            header.statut,
            &items,
        );
        let author = actor.stock_author(Some(stored.header.created_by));

        tx.update_header(kind, id, &header).await?;
        tx.replace_items(kind, id, &items).await?;
        apply_deltas(&mut tx, policy.column, &effect, author).await?;
        let document = locked(&mut tx, kind, id).await?;
        tx.commit().await?;

        info!(
            kind = %kind,
            document_id = %id,
            statut = %header.statut,
            keys = effect.stock.len(),
            snapshots = effect.snapshots.len(),
            "document updated"
        );
        Ok(document)
    }

    async fn change_status(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        id: DocumentId,
        statut: Option<&str>,
    ) -> Result<StatusChange> {
        let new = parse_statut(kind, statut).map_err(|e| rejected(kind, e))?;
        let policy = policy(kind);

        let mut tx = self.db.begin().await?;
        let stored = locked(&mut tx, kind, id).await?;
        let old = stored.statut();

        access::check_status_change(actor, old, new).map_err(|e| rejected(kind, e.into()))?;
        if old == new {
            return Ok(StatusChange {
                document: stored,
                transition: Transition::Unaffected,
                changed: false,
            });
        }

        let (transition, effect) = on_status_change(policy, old, new, &stored.items);
        let author = actor.stock_author(Some(stored.header.created_by));

        tx.set_status(kind, id, new).await?;
        apply_deltas(&mut tx, policy.column, &effect, author).await?;
        let document = locked(&mut tx, kind, id).await?;
        tx.commit().await?;

        info!(
            kind = %kind,
            document_id = %id,
            from = %old,
            statut = %new,
            transition = ?transition,
            keys = effect.stock.len(),
            snapshots = effect.snapshots.len(),
            "document status changed"
        );
        Ok(StatusChange {
            document,
            transition,
            changed: true,
        })
    }

    async fn delete(&self, actor: &Actor, kind: DocumentKind, id: DocumentId) -> Result<()> {
        let policy = policy(kind);
        let mut tx = self.db.begin().await?;
        let stored = locked(&mut tx, kind, id).await?;

        let effect = on_delete(policy, stored.statut(), &stored.items);
        let author = actor.stock_author(Some(stored.header.created_by));

        apply_deltas(&mut tx, policy.column, &effect, author).await?;
        tx.delete_document(kind, id).await?;
        tx.commit().await?;

        info!(
            kind = %kind,
            document_id = %id,
            statut = %stored.statut(),
            keys = effect.stock.len(),
            snapshots = effect.snapshots.len(),
            "document deleted"
        );
        Ok(())
    }

    async fn product_stock(&self, id: ProductId) -> Result<ProductStock> {
        self.db
            .product_stock(id)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn variant_stock(&self, id: VariantId) -> Result<VariantStock> {
        self.db
            .variant_stock(id)
            .await?
            .ok_or_else(|| StoreError::not_found("variant", id))
    }

    async fn product_snapshot(&self, id: SnapshotId) -> Result<ProductSnapshot> {
        self.db
            .product_snapshot(id)
            .await?
            .ok_or_else(|| StoreError::not_found("product snapshot", id))
    }
}
