//! Behavior with a remote store that is configured but down.

#![allow(clippy::unwrap_used)]

use bestmarket_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_readiness_reports_unreachable_remote() {
    let app = TestApp::with_unreachable_remote().await;
    let res = app.get("/health/ready").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["remote_store"], "unreachable");
}

#[tokio::test]
async fn test_writes_land_locally_when_remote_is_down() {
    let app = TestApp::with_unreachable_remote().await;

    let res = app
        .post(
            "/api/auth/register",
            json!({ "name": "Ada", "email": "ada@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["durability"], "local_only");
    assert_eq!(res.header("x-storage-durability"), Some("local_only"));

    let res = app
        .post(
            "/api/auth/login",
            json!({ "email": "ada@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(res.status, 200);

    let res = app
        .post("/api/cart/s1/add", json!({ "product_id": "1", "quantity": 2 }))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.header("x-storage-durability"), Some("local_only"));

    // Reads fall back to the local copy too
    let res = app.get("/api/cart/s1").await;
    assert_eq!(res.body[0]["quantity"], 2);
    let res = app.get("/api/products/1").await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_cart_clear_is_partial_when_remote_is_down() {
    let app = TestApp::with_unreachable_remote().await;
    app.post("/api/cart/s1/add", json!({ "product_id": "1", "quantity": 1 }))
        .await;

    let res = app.delete("/api/cart/s1/clear", None).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "partial");
    assert_eq!(res.header("x-storage-durability"), Some("local_only"));

    let res = app.get("/api/cart/s1").await;
    assert_eq!(res.body, json!([]));
}
