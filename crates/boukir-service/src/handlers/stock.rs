//! Stock level handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use boukir_core::{ProductId, SnapshotId, VariantId};
use boukir_store::{ProductSnapshot, ProductStock, VariantStock};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Get a product's stock levels.
pub async fn get_product_stock(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProductStock>, ApiError> {
    let id: ProductId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Identifiant invalide: {id}")))?;
    Ok(Json(state.store.product_stock(id).await?))
}

/// Get a variant's stock level.
pub async fn get_variant_stock(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<VariantStock>, ApiError> {
    let id: VariantId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Identifiant invalide: {id}")))?;
    Ok(Json(state.store.variant_stock(id).await?))
}

/// Get a product snapshot (stock lot).
pub async fn get_product_snapshot(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProductSnapshot>, ApiError> {
    let id: SnapshotId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Identifiant invalide: {id}")))?;
    Ok(Json(state.store.product_snapshot(id).await?))
}
