//! Checkout and order management.

#![allow(clippy::unwrap_used)]

use bestmarket_integration_tests::TestApp;
use serde_json::{Value, json};

async fn checkout(app: &TestApp, session: &str, email: &str) -> Value {
    app.post(
        &format!("/api/cart/{session}/add"),
        json!({ "product_id": "1", "quantity": 1, "color": "Black", "size": "S" }),
    )
    .await;

    let res = app
        .post(
            "/api/orders",
            json!({
                "session_id": session,
                "customer_info": { "name": "Ada", "email": email, "phone": "0800" },
                "delivery_address": { "city": "Lagos" },
            }),
        )
        .await;
    assert_eq!(res.status, 200, "{:?}", res.body);
    res.body
}

#[tokio::test]
async fn test_order_creation_empties_cart() {
    let app = TestApp::new().await;
    let body = checkout(&app, "s1", "ada@example.com").await;

    assert_eq!(body["message"], "Order created successfully");
    assert_eq!(body["order"]["status"], "confirmed");
    assert_eq!(body["order"]["subtotal"], 18_000);
    assert_eq!(body["order"]["total"], 18_000 + 1_350 + 2_500);
    assert_eq!(body["durability"], "local_only");

    let cart = app.get("/api/cart/s1").await;
    assert_eq!(cart.body, json!([]));
}

#[tokio::test]
async fn test_order_requires_items() {
    let app = TestApp::new().await;
    let res = app
        .post("/api/orders", json!({ "session_id": "empty" }))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["error"], "Cart is empty");
}

#[tokio::test]
async fn test_orders_for_user_and_cancel() {
    let app = TestApp::new().await;
    let first = checkout(&app, "s1", "ada@example.com").await;
    checkout(&app, "s2", "bola@example.com").await;

    let res = app.get("/api/orders/user/ADA@example.com").await;
    let orders = res.body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], first["order"]["id"]);

    let id = first["order"]["id"].as_i64().unwrap();
    let res = app
        .send(
            axum::http::Method::PUT,
            &format!("/api/orders/{id}/cancel"),
            None,
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["order"]["status"], "cancelled");

    let res = app
        .send(
            axum::http::Method::PUT,
            &format!("/api/orders/{id}/cancel"),
            None,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["error"], "Cannot cancel this order");
}

#[tokio::test]
async fn test_admin_updates_order_status() {
    let app = TestApp::new().await;
    let body = checkout(&app, "s1", "ada@example.com").await;
    let id = body["order"]["id"].as_i64().unwrap();

    let res = app
        .put(&format!("/api/admin/orders/{id}"), json!({ "status": "shipped" }))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["message"], "Order status updated");

    let res = app
        .put(&format!("/api/admin/orders/{id}"), json!({ "status": "lost" }))
        .await;
    assert_eq!(res.status, 400);

    let res = app
        .put("/api/admin/orders/9999", json!({ "status": "shipped" }))
        .await;
    assert_eq!(res.status, 404);

    let all = app.get("/api/admin/orders").await;
    assert_eq!(all.body[0]["status"], "shipped");
}

#[tokio::test]
async fn test_test_reference_payment_is_recorded() {
    let app = TestApp::new().await;

    let res = app
        .post("/api/payment/verify", json!({ "reference": "BMP_12345" }))
        .await;
    assert_eq!(res.status, 200, "{:?}", res.body);
    assert_eq!(res.body["message"], "Payment verified (test mode)");
    assert_eq!(res.body["order"]["status"], "paid");

    let history = app.get("/api/payments/history/all").await;
    let references: Vec<&str> = history
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["reference"].as_str())
        .collect();
    assert_eq!(references, ["BMP_12345"]);
}

#[tokio::test]
async fn test_verify_requires_reference() {
    let app = TestApp::new().await;
    let res = app.post("/api/payment/verify", json!({})).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn test_webhook_ignores_other_events() {
    let app = TestApp::new().await;
    let res = app
        .post("/api/payment/webhook", json!({ "event": "transfer.success" }))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "ignored");
}
