//! Health endpoint tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_returns_ok() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "boukir-service");
}

#[tokio::test]
async fn health_does_not_require_auth() {
    let harness = TestHarness::new().await;

    // No authorization header
    let response = harness.server.get("/health").await;

    response.assert_status_ok();
}
