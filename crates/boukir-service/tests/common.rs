//! Common test utilities for boukir-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use boukir_core::{ProductId, SnapshotId, VariantId};
use boukir_service::auth::Claims;
use boukir_service::{create_router, AppState, ServiceConfig};
use boukir_store::{DocumentLedger, MemoryDatabase, ProductSnapshot, ProductStock, VariantStock};

/// Secret the harness signs tokens with.
pub const JWT_SECRET: &str = "test-secret";

/// Product seeded with 10 in shop stock, 2 shared with e-commerce and a cost of 8.
pub const PRODUCT: i64 = 5;

/// Variant of [`PRODUCT`] seeded with 1 in stock.
pub const VARIANT: i64 = 40;

/// Stock lot of [`PRODUCT`] seeded with 2 left.
pub const LOT: i64 = 70;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
}

impl TestHarness {
    /// Create a new test harness with a freshly seeded in-memory database.
    pub async fn new() -> Self {
        let db = MemoryDatabase::new();
        db.put_product(ProductStock {
            prix_achat: Some(dec!(6)),
            cout_revient: Some(dec!(8)),
            ..ProductStock::new(ProductId::new(PRODUCT), dec!(10), dec!(2))
        })
        .await;
        db.put_variant(VariantStock {
            id: VariantId::new(VARIANT),
            product_id: ProductId::new(PRODUCT),
            stock_quantity: dec!(1),
            updated_at: None,
        })
        .await;
        db.put_snapshot(ProductSnapshot::new(
            SnapshotId::new(LOT),
            ProductId::new(PRODUCT),
            dec!(2),
        ))
        .await;

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: JWT_SECRET.into(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(Arc::new(DocumentLedger::new(db)), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server }
    }
}

/// A signed token for employee `id` with `role`.
pub fn token(role: &str, id: i64) -> String {
    let claims = Claims {
        id: Some(id),
        role: role.into(),
        exp: 4_000_000_000,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// The `authorization` header carrying `token`.
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value"),
    )
}

/// Header for a PDG session.
pub fn pdg() -> (HeaderName, HeaderValue) {
    bearer(&token("PDG", 1))
}

/// Header for a lead driver session.
pub fn driver() -> (HeaderName, HeaderValue) {
    bearer(&token("ChefChauffeur", 2))
}

/// Parse a serialized decimal (string or number).
pub fn decimal(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).expect("decimal value")
}
