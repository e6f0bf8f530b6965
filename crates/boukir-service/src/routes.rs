//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, patch};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{documents, health, stock};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Documents (JWT auth)
/// - `GET /api/documents/:kind` - List documents (`?includeCalc=1` adds profit)
/// - `POST /api/documents/:kind` - Create a document
/// - `GET /api/documents/:kind/:id` - Get a document
/// - `PUT /api/documents/:kind/:id` - Replace a document
/// - `DELETE /api/documents/:kind/:id` - Delete a document
/// - `PATCH /api/documents/:kind/:id/statut` - Change a document's status
///
/// ## Stock (JWT auth)
/// - `GET /api/stock/products/:id` - Product stock levels
/// - `GET /api/stock/variants/:id` - Variant stock level
/// - `GET /api/stock/snapshots/:id` - Product snapshot (stock lot) quantity
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        .route(
            "/documents/:kind",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/documents/:kind/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/documents/:kind/:id/statut", patch(documents::change_status))
        .route("/stock/products/:id", get(stock::get_product_stock))
        .route("/stock/variants/:id", get(stock::get_variant_stock))
        .route("/stock/snapshots/:id", get(stock::get_product_snapshot))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
