//! Service-level endpoints, catalog, promo and error shapes.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, header};
use bestmarket_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_banner_and_health() {
    let app = TestApp::new().await;

    let res = app.get("/").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["message"], "Best Market Place API");
    assert_eq!(res.body["status"], "running");

    let res = app.get("/health").await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_readiness_reports_disabled_remote() {
    let app = TestApp::new().await;
    let res = app.get("/health/ready").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({ "status": "ok", "remote_store": "disabled" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let res = app.send_request(request).await;
    assert_eq!(res.header("x-request-id"), Some("abc-123"));
}

#[tokio::test]
async fn test_products_filtering() {
    let app = TestApp::new().await;

    let all = app.get("/api/products").await;
    assert_eq!(all.body.as_array().unwrap().len(), 11);

    let res = app.get("/api/products?min_price=100000").await;
    let ids: Vec<&str> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, ["7"]);

    let res = app.get("/api/products?min_price=cheap").await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn test_fractional_price_bounds_are_exclusive_of_rounded_prices() {
    let app = TestApp::new().await;

    let res = app.get("/api/products?min_price=18000.5").await;
    let prices: Vec<i64> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["price"].as_i64())
        .collect();
    assert!(!prices.contains(&18_000));
    assert_eq!(prices.len(), 10);

    let res = app.get("/api/products?max_price=18000.9").await;
    let ids: Vec<&str> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, ["1"]);
}

#[tokio::test]
async fn test_product_not_found() {
    let app = TestApp::new().await;
    let res = app.get("/api/products/404").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body, json!({ "error": "Product not found" }));
}

#[tokio::test]
async fn test_admin_product_lifecycle() {
    let app = TestApp::new().await;

    let res = app
        .post(
            "/api/admin/products",
            json!({
                "name": "Linen Shirt",
                "brand": "BMP",
                "category": "men",
                "price": 21000,
                "stock": 4,
            }),
        )
        .await;
    assert_eq!(res.status, 200, "{:?}", res.body);
    assert_eq!(res.body["message"], "Product added successfully");
    assert_eq!(res.header("x-storage-durability"), Some("local_only"));
    let id = res.body["product"]["id"].as_str().unwrap().to_owned();
    assert_eq!(id, "12");

    let res = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(res.body["name"], "Linen Shirt");

    let res = app
        .delete(&format!("/api/admin/products/{id}"), None)
        .await;
    assert_eq!(res.body["message"], "Product deleted successfully");

    let res = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_promo_validation() {
    let app = TestApp::new().await;

    let res = app.post("/api/promo/validate", json!({ "code": "234567" })).await;
    assert_eq!(res.body["valid"], true);
    assert_eq!(res.body["discount"], 10);
    assert_eq!(res.body["type"], "percentage");

    let res = app.post("/api/promo/validate", json!({ "code": "FREE" })).await;
    assert_eq!(res.body, json!({ "valid": false, "message": "Invalid promo code" }));
}

#[tokio::test]
async fn test_newsletter_subscription() {
    let app = TestApp::new().await;

    let res = app
        .post("/api/newsletter/subscribe", json!({ "email": "ada@example.com" }))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["message"], "Successfully subscribed to newsletter!");

    let res = app
        .post("/api/newsletter/subscribe", json!({ "email": "ADA@example.com" }))
        .await;
    assert_eq!(res.body["message"], "Email already subscribed");

    let res = app
        .post("/api/newsletter/subscribe", json!({ "email": "nope" }))
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn test_malformed_json_is_a_json_error() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let res = app.send_request(request).await;
    assert_eq!(res.status, 400);
    assert!(res.body["error"].is_string());
}
