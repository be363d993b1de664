//! Cart endpoints: stock checks, pricing and clearing.

#![allow(clippy::unwrap_used)]

use bestmarket_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_add_rejects_quantity_over_stock() {
    let app = TestApp::new().await;

    // Product 7 has 8 in stock
    let res = app
        .post(
            "/api/cart/s1/add",
            json!({ "product_id": "7", "quantity": 9, "color": "Black", "size": "M" }),
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["error"], "Insufficient stock");
}

#[tokio::test]
async fn test_add_counts_quantity_already_in_cart() {
    let app = TestApp::new().await;
    let line = json!({ "product_id": 7, "quantity": 5, "color": "Black", "size": "M" });

    let res = app.post("/api/cart/s1/add", line.clone()).await;
    assert_eq!(res.status, 200);

    let res = app.post("/api/cart/s1/add", line).await;
    assert_eq!(res.status, 400);

    let cart = app.get("/api/cart/s1").await;
    assert_eq!(cart.body[0]["quantity"], 5);
}

#[tokio::test]
async fn test_add_merges_same_variant() {
    let app = TestApp::new().await;
    let line = json!({ "product_id": "3", "quantity": 1, "color": "Brown" });

    app.post("/api/cart/s1/add", line.clone()).await;
    let res = app.post("/api/cart/s1/add", line).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["message"], "Item added to cart");
    let cart = res.body["cart"].as_array().unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0]["item_key"], "3_Brown_default");
    assert_eq!(cart[0]["quantity"], 2);
}

#[tokio::test]
async fn test_add_unknown_product() {
    let app = TestApp::new().await;
    let res = app
        .post("/api/cart/s1/add", json!({ "product_id": "999", "quantity": 1 }))
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["error"], "Product not found");
}

#[tokio::test]
async fn test_summary_totals_below_free_shipping() {
    let app = TestApp::new().await;
    app.post(
        "/api/cart/s1/add",
        json!({ "product_id": "1", "quantity": 2, "color": "White", "size": "M" }),
    )
    .await;

    let res = app.get("/api/cart/s1/summary").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["item_count"], 2);
    assert_eq!(res.body["subtotal"], 36_000);
    assert_eq!(res.body["tax"], 2_700);
    assert_eq!(res.body["shipping"], 2_500);
    assert_eq!(res.body["total"], 41_200);
}

#[tokio::test]
async fn test_summary_free_shipping_with_promo() {
    let app = TestApp::new().await;
    // 2 x 55000 = 110000; 10% off = 99000 taxable
    app.post(
        "/api/cart/s1/add",
        json!({ "product_id": "10", "quantity": 2, "color": "White", "size": "42" }),
    )
    .await;

    let res = app.get("/api/cart/s1/summary?promo=234567").await;
    assert_eq!(res.body["subtotal"], 110_000);
    assert_eq!(res.body["discount"], 11_000);
    assert_eq!(res.body["tax"], 7_425);
    assert_eq!(res.body["shipping"], 0);
    assert_eq!(res.body["total"], 106_425);
    assert_eq!(res.body["promo_code"], "234567");
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let app = TestApp::new().await;
    app.post(
        "/api/cart/s1/add",
        json!({ "product_id": "2", "quantity": 1, "color": "Black", "size": "32" }),
    )
    .await;

    let res = app
        .put(
            "/api/cart/s1/update",
            json!({ "item_key": "2_Black_32", "quantity": 3 }),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["cart"][0]["quantity"], 3);

    let res = app
        .put(
            "/api/cart/s1/update",
            json!({ "item_key": "2_Black_32", "quantity": 0 }),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["cart"], json!([]));
}

#[tokio::test]
async fn test_clear_reports_local_only() {
    let app = TestApp::new().await;
    app.post("/api/cart/s1/add", json!({ "product_id": "5", "quantity": 1 }))
        .await;

    let res = app.delete("/api/cart/s1/clear", None).await;
    assert_eq!(res.status, 200);
    // With no remote store configured, clearing the local cart is complete
    assert_eq!(res.body["status"], "success");
    assert_eq!(res.body["durability"], "local_only");
    assert_eq!(res.header("x-storage-durability"), Some("local_only"));

    let cart = app.get("/api/cart/s1").await;
    assert_eq!(cart.body, json!([]));
}

#[tokio::test]
async fn test_carts_are_isolated_by_session() {
    let app = TestApp::new().await;
    app.post("/api/cart/alice/add", json!({ "product_id": "5", "quantity": 1 }))
        .await;

    let res = app.get("/api/cart/bob").await;
    assert_eq!(res.body, json!([]));
}
