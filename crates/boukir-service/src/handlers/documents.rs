//! Credit note handlers.
//!
//! Every route is keyed by the kind slug (`avoirs_client`, `avoirs_comptant`,
//! `avoirs_ecommerce`). Stock effects are applied by the store inside the same transaction
//! as the document write; handlers only translate HTTP to store calls.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boukir_core::{
    Document, DocumentDraft, DocumentHeader, DocumentId, DocumentKind, LineItem, MouvementCalc,
    Statut,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// A document as returned by the API.
#[derive(Debug, Serialize)]
pub struct DocumentView {
    /// Identifier within the kind.
    pub id: DocumentId,
    /// Display number, e.g. `AVC03`.
    pub numero: String,
    /// Kind slug.
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    /// Header fields.
    #[serde(flatten)]
    pub header: DocumentHeader,
    /// Line items with product costs.
    pub items: Vec<LineItem>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Profit summary, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouvement_calc: Option<MouvementCalc>,
}

impl DocumentView {
    fn new(document: Document, include_calc: bool) -> Self {
        let numero = document.numero();
        let mouvement_calc =
            include_calc.then(|| MouvementCalc::compute(document.kind, &document.items));
        Self {
            id: document.id,
            numero,
            kind: document.kind,
            header: document.header,
            items: document.items,
            created_at: document.created_at,
            updated_at: document.updated_at,
            mouvement_calc,
        }
    }
}

/// Query parameters of read endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ReadQuery {
    /// `1` or `true` (any case) adds `mouvement_calc` to every document.
    #[serde(default, rename = "includeCalc")]
    pub include_calc: Option<String>,
}

impl ReadQuery {
    fn include_calc(&self) -> bool {
        self.include_calc
            .as_deref()
            .map(str::trim)
            .is_some_and(|flag| flag == "1" || flag.eq_ignore_ascii_case("true"))
    }
}

/// Response to a successful creation.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    /// Confirmation message.
    pub message: String,
    /// New document id.
    pub id: DocumentId,
    /// Display number.
    pub numero: String,
}

/// Response to a successful update.
#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    /// Confirmation message.
    pub message: String,
    /// The document after the update.
    pub data: DocumentView,
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Target status label.
    #[serde(default)]
    pub statut: Option<String>,
}

/// Id and status of a document whose status did not change.
#[derive(Debug, Serialize)]
pub struct UnchangedStatus {
    /// Document id.
    pub id: DocumentId,
    /// Current status.
    pub statut: Statut,
}

/// Payload of a status change response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatusData {
    /// The document already had the status.
    Unchanged(UnchangedStatus),
    /// The document after the change.
    Updated(Box<DocumentView>),
}

/// Response to a status change.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Outcome payload.
    pub data: StatusData,
}

/// Response to a deletion.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    /// Always `true`.
    pub success: bool,
    /// Deleted document id.
    pub id: DocumentId,
}

fn parse_kind(slug: &str) -> Result<DocumentKind, ApiError> {
    slug.parse().map_err(ApiError::from)
}

fn parse_id(raw: &str) -> Result<DocumentId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Identifiant invalide: {raw}")))
}

/// List the documents of a kind.
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(kind): Path<String>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<Vec<DocumentView>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let include_calc = query.include_calc();
    let documents = state.store.list(kind).await?;

    Ok(Json(
        documents
            .into_iter()
            .map(|document| DocumentView::new(document, include_calc))
            .collect(),
    ))
}

/// Get one document.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<DocumentView>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    let document = state.store.get(kind, id).await?;

    Ok(Json(DocumentView::new(document, query.include_calc())))
}

/// Create a document and apply its stock effect.
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(kind): Path<String>,
    body: Result<Json<DocumentDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let kind = parse_kind(&kind)?;
    let Json(draft) = body?;
    let document = state.store.create(&auth.actor, kind, draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: format!("{} {} créé avec succès", kind.label(), document.numero()),
            id: document.id,
            numero: document.numero(),
        }),
    ))
}

/// Replace a document's header and items.
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((kind, id)): Path<(String, String)>,
    body: Result<Json<DocumentDraft>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    let Json(draft) = body?;
    let document = state.store.update(&auth.actor, kind, id, draft).await?;

    Ok(Json(UpdatedResponse {
        message: format!("{} {} mis à jour avec succès", kind.label(), document.numero()),
        data: DocumentView::new(document, false),
    }))
}

/// Change a document's status.
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((kind, id)): Path<(String, String)>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    let Json(request) = body?;
    let change = state
        .store
        .change_status(&auth.actor, kind, id, request.statut.as_deref())
        .await?;

    let statut = change.document.statut();
    let response = if change.changed {
        StatusResponse {
            success: true,
            message: format!("Statut mis à jour: {statut}"),
            data: StatusData::Updated(Box::new(DocumentView::new(change.document, false))),
        }
    } else {
        StatusResponse {
            success: true,
            message: "Aucun changement de statut".into(),
            data: StatusData::Unchanged(UnchangedStatus {
                id: change.document.id,
                statut,
            }),
        }
    };

    Ok(Json(response))
}

/// Delete a document, removing its stock effect.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    state.store.delete(&auth.actor, kind, id).await?;

    Ok(Json(DeletedResponse { success: true, id }))
}
