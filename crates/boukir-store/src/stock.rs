//! Delta applier.

use boukir_core::{DeltaKey, SnapshotId, StockColumn, StockEffect, UserId};
use tracing::debug;

use crate::error::Result;
use crate::StockTx;

/// Apply `effect` to stock inside `tx`.
///
/// Rows are locked in key order before any write, so two transactions touching overlapping
/// products always acquire their locks in the same order. Stock rows are locked before
/// snapshot rows. Each non-zero key receives exactly one write. The caller owns the
/// transaction: on error it must drop it, which rolls back any write already issued.
///
/// Snapshot quantities are floored at zero; product and variant stock is not.
///
/// `acting_user` is recorded on product rows when known; an unknown author does not prevent
/// the move.
///
/// # Errors
///
/// Returns `StoreError::NotFound` if a product, variant or snapshot row is missing, or any
/// database error raised by the backend.
pub async fn apply_deltas<T: StockTx>(
    tx: &mut T,
    column: StockColumn,
    effect: &StockEffect,
    acting_user: Option<UserId>,
) -> Result<()> {
    if effect.is_empty() {
        return Ok(());
    }

    let keys: Vec<DeltaKey> = effect.stock.keys().collect();
    if !keys.is_empty() {
        tx.lock_stock(&keys).await?;
    }
    let lots: Vec<SnapshotId> = effect.snapshots.keys().collect();
    if !lots.is_empty() {
        tx.lock_snapshots(&lots).await?;
    }

    for (key, delta) in effect.stock.iter() {
        tx.increment_stock(column, key, delta, acting_user).await?;
        debug!(
            key = %key,
            delta = %delta,
            column = column.product_column(),
            acting_user = ?acting_user,
            "stock adjusted"
        );
    }
    for (lot, delta) in effect.snapshots.iter() {
        tx.adjust_snapshot(lot, delta).await?;
        debug!(snapshot = %lot, delta = %delta, "snapshot adjusted");
    }
    Ok(())
}
