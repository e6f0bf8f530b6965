//! PostgreSQL backend.
//!
//! Statements are built at runtime from the per-kind table layout in [`crate::schema`], so the
//! three credit-note kinds share one implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::info;

use boukir_core::{
    DeltaKey, Document, DocumentHeader, DocumentId, DocumentKind, LineItem, ProductId,
    SnapshotId, StockColumn, Statut, UnitId, UserId, VariantId,
};

use crate::error::{Result, StoreError};
use crate::schema::{self, tables, DocumentTables};
use crate::{Database, ProductSnapshot, ProductStock, StockTx, VariantStock};

/// Connection settings of the PostgreSQL backend.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
    /// `statement_timeout` applied to every transaction, in milliseconds.
    pub statement_timeout_ms: u64,
    /// `lock_timeout` applied to every transaction, in milliseconds.
    pub lock_timeout_ms: u64,
}

/// PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
    statement_timeout_ms: u64,
    lock_timeout_ms: u64,
}

impl PgDatabase {
    /// Connect a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable.
    pub async fn connect(config: &PgConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await?;
        Ok(Self {
            pool,
            statement_timeout_ms: config.statement_timeout_ms,
            lock_timeout_ms: config.lock_timeout_ms,
        })
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }
}

fn header_select(t: &DocumentTables) -> String {
    format!(
        "SELECT id, date_creation, client_id, {name} AS client_nom, {phone} AS phone, \
         lieu_chargement, adresse_livraison, ecommerce_order_id, customer_email, montant_total, \
         statut, created_by, is_not_calculated, created_at, updated_at FROM {header}",
        name = t.client_name,
        phone = t.phone,
        header = t.header,
    )
}

fn items_select(t: &DocumentTables) -> String {
    format!(
        "SELECT i.{fk} AS document_id, i.product_id, i.variant_id, i.unit_id, i.quantite, \
         i.prix_unitaire, i.remise_pourcentage, i.remise_montant, i.total, \
         i.product_snapshot_id, p.{prix_achat} AS prix_achat, p.{cout_revient} AS cout_revient \
         FROM {items} i LEFT JOIN {products} p ON p.id = i.product_id \
         WHERE i.{fk} = ANY($1) ORDER BY i.id",
        fk = t.foreign_key,
        items = t.items,
        products = schema::products::TABLE,
        prix_achat = schema::products::PRIX_ACHAT,
        cout_revient = schema::products::COUT_REVIENT,
    )
}

fn parse_header(row: &PgRow) -> Result<(DocumentId, DocumentHeader)> {
    let statut: String = row.try_get("statut")?;
    let header = DocumentHeader {
        date_creation: row.try_get("date_creation")?,
        client_id: row.try_get("client_id")?,
        client_nom: row.try_get("client_nom")?,
        phone: row.try_get("phone")?,
        lieu_chargement: row.try_get("lieu_chargement")?,
        adresse_livraison: row.try_get("adresse_livraison")?,
        ecommerce_order_id: row.try_get("ecommerce_order_id")?,
        customer_email: row.try_get("customer_email")?,
        montant_total: row.try_get("montant_total")?,
        statut: statut.parse::<Statut>()?,
        created_by: UserId::new(row.try_get("created_by")?),
        is_not_calculated: row.try_get("is_not_calculated")?,
    };
    Ok((DocumentId::new(row.try_get("id")?), header))
}

fn parse_item(row: &PgRow) -> Result<(DocumentId, LineItem)> {
    let item = LineItem {
        product_id: row.try_get::<Option<i64>, _>("product_id")?.map(ProductId::new),
        variant_id: row.try_get::<Option<i64>, _>("variant_id")?.map(VariantId::new),
        unit_id: row.try_get::<Option<i64>, _>("unit_id")?.map(UnitId::new),
        quantite: row.try_get("quantite")?,
        prix_unitaire: row.try_get("prix_unitaire")?,
        remise_pourcentage: row
            .try_get::<Option<Decimal>, _>("remise_pourcentage")?
            .unwrap_or_default(),
        remise_montant: row
            .try_get::<Option<Decimal>, _>("remise_montant")?
            .unwrap_or_default(),
        total: row.try_get("total")?,
        product_snapshot_id: row
            .try_get::<Option<i64>, _>("product_snapshot_id")?
            .map(SnapshotId::new),
        prix_achat: row.try_get("prix_achat")?,
        cout_revient: row.try_get("cout_revient")?,
    };
    Ok((DocumentId::new(row.try_get("document_id")?), item))
}

/// Assemble documents from header rows and the item rows of those headers.
fn assemble(kind: DocumentKind, headers: &[PgRow], items: &[PgRow]) -> Result<Vec<Document>> {
    let mut by_document: HashMap<DocumentId, Vec<LineItem>> = HashMap::new();
    for row in items {
        let (id, item) = parse_item(row)?;
        by_document.entry(id).or_default().push(item);
    }
    headers
        .iter()
        .map(|row| -> Result<Document> {
            let (id, header) = parse_header(row)?;
            Ok(Document {
                id,
                kind,
                header,
                items: by_document.remove(&id).unwrap_or_default(),
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}

fn header_ids(headers: &[PgRow]) -> Result<Vec<i64>> {
    headers
        .iter()
        .map(|row| row.try_get::<i64, _>("id").map_err(StoreError::from))
        .collect()
}

fn parse_product(row: &PgRow) -> Result<ProductStock> {
    Ok(ProductStock {
        id: ProductId::new(row.try_get("id")?),
        quantite: row.try_get::<Option<Decimal>, _>("quantite")?.unwrap_or_default(),
        stock_partage_ecom_qty: row
            .try_get::<Option<Decimal>, _>("stock_partage_ecom_qty")?
            .unwrap_or_default(),
        prix_achat: row.try_get("prix_achat")?,
        cout_revient: row.try_get("cout_revient")?,
        updated_by: row.try_get::<Option<i64>, _>("updated_by")?.map(UserId::new),
        updated_at: row.try_get("updated_at")?,
    })
}

fn parse_snapshot(row: &PgRow) -> Result<ProductSnapshot> {
    Ok(ProductSnapshot {
        id: SnapshotId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        variant_id: row.try_get::<Option<i64>, _>("variant_id")?.map(VariantId::new),
        prix_vente: row.try_get("prix_vente")?,
        quantite: row.try_get::<Option<Decimal>, _>("quantite")?.unwrap_or_default(),
    })
}

fn parse_variant(row: &PgRow) -> Result<VariantStock> {
    Ok(VariantStock {
        id: VariantId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        stock_quantity: row
            .try_get::<Option<Decimal>, _>("stock_quantity")?
            .unwrap_or_default(),
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Database for PgDatabase {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let mut tx = self.pool.begin().await?;
        // SET LOCAL takes no bind parameters; both values are integers.
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout_ms
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = {}", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }

    async fn list_documents(&self, kind: DocumentKind) -> Result<Vec<Document>> {
        let t = tables(kind);
        let headers = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, id DESC",
            header_select(t)
        ))
        .fetch_all(&self.pool)
        .await?;
        let items = sqlx::query(&items_select(t))
            .bind(header_ids(&headers)?)
            .fetch_all(&self.pool)
            .await?;
        assemble(kind, &headers, &items)
    }

    async fn get_document(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>> {
        let t = tables(kind);
        let headers = sqlx::query(&format!("{} WHERE id = $1", header_select(t)))
            .bind(id.get())
            .fetch_all(&self.pool)
            .await?;
        let items = sqlx::query(&items_select(t))
            .bind(vec![id.get()])
            .fetch_all(&self.pool)
            .await?;
        Ok(assemble(kind, &headers, &items)?.into_iter().next())
    }

    async fn product_stock(&self, id: ProductId) -> Result<Option<ProductStock>> {
        let row = sqlx::query(
            "SELECT id, quantite, stock_partage_ecom_qty, prix_achat, cout_revient, updated_by, \
             updated_at FROM products WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_product).transpose()
    }

    async fn variant_stock(&self, id: VariantId) -> Result<Option<VariantStock>> {
        let row = sqlx::query(
            "SELECT id, product_id, stock_quantity, updated_at FROM product_variants WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_variant).transpose()
    }

    async fn product_snapshot(&self, id: SnapshotId) -> Result<Option<ProductSnapshot>> {
        let row = sqlx::query(&format!(
            "SELECT id, product_id, variant_id, prix_vente, {stock} AS quantite FROM {table} \
             WHERE id = $1",
            table = schema::snapshots::TABLE,
            stock = schema::snapshots::STOCK,
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_snapshot).transpose()
    }
}

/// Transaction of the PostgreSQL backend. Rolls back when dropped.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    async fn insert_items(
        &mut self,
        t: &DocumentTables,
        id: DocumentId,
        items: &[LineItem],
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {items} ({fk}, product_id, variant_id, unit_id, quantite, prix_unitaire, \
             remise_pourcentage, remise_montant, total, product_snapshot_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            items = t.items,
            fk = t.foreign_key,
        );
        for item in items {
            sqlx::query(&sql)
                .bind(id.get())
                .bind(item.product_id.map(ProductId::get))
                .bind(item.variant_id.map(VariantId::get))
                .bind(item.unit_id.map(UnitId::get))
                .bind(item.quantite)
                .bind(item.prix_unitaire)
                .bind(item.remise_pourcentage)
                .bind(item.remise_montant)
                .bind(item.total)
                .bind(item.product_snapshot_id.map(SnapshotId::get))
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn lock_ids(&mut self, table: &str, entity: &str, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let locked: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {table} WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        match ids.iter().copied().find(|id| !locked.contains(id)) {
            Some(missing) => Err(StoreError::not_found(entity, missing)),
            None => Ok(()),
        }
    }
}

fn snapshot_adjust() -> String {
    format!(
        "UPDATE {table} SET {stock} = GREATEST(COALESCE({stock}, 0) + $1, 0) WHERE id = $2",
        table = schema::snapshots::TABLE,
        stock = schema::snapshots::STOCK,
    )
}

fn expect_one(affected: u64, entity: &str, id: impl ToString) -> Result<()> {
    if affected == 0 {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

#[async_trait]
impl StockTx for PgTx {
    async fn lock_document(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Option<Document>> {
        let t = tables(kind);
        let headers = sqlx::query(&format!("{} WHERE id = $1 FOR UPDATE", header_select(t)))
            .bind(id.get())
            .fetch_all(&mut *self.tx)
            .await?;
        if headers.is_empty() {
            return Ok(None);
        }
        let items = sqlx::query(&items_select(t))
            .bind(vec![id.get()])
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(assemble(kind, &headers, &items)?.into_iter().next())
    }

    async fn insert_document(
        &mut self,
        kind: DocumentKind,
        header: &DocumentHeader,
        items: &[LineItem],
    ) -> Result<DocumentId> {
        let t = tables(kind);
        let raw: i64 = sqlx::query_scalar(&format!(
            "INSERT INTO {header} (date_creation, client_id, {name}, {phone}, lieu_chargement, \
             adresse_livraison, ecommerce_order_id, customer_email, montant_total, statut, \
             created_by, is_not_calculated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
            header = t.header,
            name = t.client_name,
            phone = t.phone,
        ))
        .bind(header.date_creation)
        .bind(header.client_id)
        .bind(header.client_nom.as_deref())
        .bind(header.phone.as_deref())
        .bind(header.lieu_chargement.as_deref())
        .bind(header.adresse_livraison.as_deref())
        .bind(header.ecommerce_order_id)
        .bind(header.customer_email.as_deref())
        .bind(header.montant_total)
        .bind(header.statut.label())
        .bind(header.created_by.get())
        .bind(header.is_not_calculated)
        .fetch_one(&mut *self.tx)
        .await?;
        let id = DocumentId::new(raw);
        self.insert_items(t, id, items).await?;
        Ok(id)
    }

    async fn update_header(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        header: &DocumentHeader,
    ) -> Result<()> {
        let t = tables(kind);
        let result = sqlx::query(&format!(
            "UPDATE {header} SET date_creation = $1, client_id = $2, {name} = $3, {phone} = $4, \
             lieu_chargement = $5, adresse_livraison = $6, ecommerce_order_id = $7, \
             customer_email = $8, montant_total = $9, statut = $10, created_by = $11, \
             is_not_calculated = $12, updated_at = NOW() WHERE id = $13",
            header = t.header,
            name = t.client_name,
            phone = t.phone,
        ))
        .bind(header.date_creation)
        .bind(header.client_id)
        .bind(header.client_nom.as_deref())
        .bind(header.phone.as_deref())
        .bind(header.lieu_chargement.as_deref())
        .bind(header.adresse_livraison.as_deref())
        .bind(header.ecommerce_order_id)
        .bind(header.customer_email.as_deref())
        .bind(header.montant_total)
        .bind(header.statut.label())
        .bind(header.created_by.get())
        .bind(header.is_not_calculated)
        .bind(id.get())
        .execute(&mut *self.tx)
        .await?;
        expect_one(result.rows_affected(), kind.slug(), id)
    }

    async fn set_status(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        statut: Statut,
    ) -> Result<()> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET statut = $1, updated_at = NOW() WHERE id = $2",
            tables(kind).header
        ))
        .bind(statut.label())
        .bind(id.get())
        .execute(&mut *self.tx)
        .await?;
        expect_one(result.rows_affected(), kind.slug(), id)
    }

    async fn replace_items(
        &mut self,
        kind: DocumentKind,
        id: DocumentId,
        items: &[LineItem],
    ) -> Result<()> {
        let t = tables(kind);
        sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", t.items, t.foreign_key))
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        self.insert_items(t, id, items).await
    }

    async fn delete_document(&mut self, kind: DocumentKind, id: DocumentId) -> Result<()> {
        let t = tables(kind);
        sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", t.items, t.foreign_key))
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", t.header))
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        expect_one(result.rows_affected(), kind.slug(), id)
    }

    async fn lock_stock(&mut self, keys: &[DeltaKey]) -> Result<()> {
        let mut products: Vec<i64> = keys
            .iter()
            .filter(|key| key.variant_id.is_none())
            .map(|key| key.product_id.get())
            .collect();
        let mut variants: Vec<i64> = keys
            .iter()
            .filter_map(|key| key.variant_id.map(VariantId::get))
            .collect();
        products.sort_unstable();
        products.dedup();
        variants.sort_unstable();
        variants.dedup();

        self.lock_ids(schema::products::TABLE, "product", &products)
            .await?;
        self.lock_ids(schema::variants::TABLE, "variant", &variants)
            .await
    }

    async fn increment_stock(
        &mut self,
        column: StockColumn,
        key: DeltaKey,
        delta: Decimal,
        acting_user: Option<UserId>,
    ) -> Result<()> {
        if let Some(variant_id) = key.variant_id {
            let result = sqlx::query(&format!(
                "UPDATE {table} SET {stock} = COALESCE({stock}, 0) + $1, updated_at = NOW() \
                 WHERE id = $2",
                table = schema::variants::TABLE,
                stock = schema::variants::STOCK,
            ))
            .bind(delta)
            .bind(variant_id.get())
            .execute(&mut *self.tx)
            .await?;
            return expect_one(result.rows_affected(), "variant", variant_id);
        }

        let result = sqlx::query(&format!(
            "UPDATE {table} SET {stock} = COALESCE({stock}, 0) + $1, updated_by = $2, \
             updated_at = NOW() WHERE id = $3",
            table = schema::products::TABLE,
            stock = column.product_column(),
        ))
        .bind(delta)
        .bind(acting_user.map(UserId::get))
        .bind(key.product_id.get())
        .execute(&mut *self.tx)
        .await?;
        expect_one(result.rows_affected(), "product", key.product_id)
    }

    async fn lock_snapshots(&mut self, ids: &[SnapshotId]) -> Result<()> {
        let mut ids: Vec<i64> = ids.iter().copied().map(SnapshotId::get).collect();
        ids.sort_unstable();
        ids.dedup();
        self.lock_ids(schema::snapshots::TABLE, "product snapshot", &ids)
            .await
    }

    async fn adjust_snapshot(&mut self, id: SnapshotId, delta: Decimal) -> Result<()> {
        let result = sqlx::query(&snapshot_adjust())
            .bind(delta)
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        expect_one(result.rows_affected(), "product snapshot", id)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecommerce_header_select_aliases_customer_columns() {
        let sql = header_select(tables(DocumentKind::AvoirEcommerce));
        assert!(sql.contains("customer_name AS client_nom"));
        assert!(sql.contains("customer_phone AS phone"));
        assert!(sql.ends_with("FROM avoirs_ecommerce"));
    }

    #[test]
    fn items_select_filters_on_the_kind_foreign_key() {
        let sql = items_select(tables(DocumentKind::AvoirComptant));
        assert!(sql.contains("FROM avoir_comptant_items i"));
        assert!(sql.contains("WHERE i.avoir_comptant_id = ANY($1)"));
        assert!(sql.contains("i.product_snapshot_id"));
    }

    #[test]
    fn snapshot_adjustment_floors_at_zero() {
        assert_eq!(
            snapshot_adjust(),
            "UPDATE product_snapshot SET quantite = GREATEST(COALESCE(quantite, 0) + $1, 0) \
             WHERE id = $2"
        );
    }
}
