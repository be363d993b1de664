//! Admin route handlers: users, orders and catalog edits.
//!
//! These routes carry no authentication of their own; deployments put them
//! behind the admin frontend's access controls.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bestmarket_core::{OrderId, OrderStatus, ProductId};

use super::Persisted;
use crate::error::{AppError, Result};
use crate::models::{Order, ProductInput, UserSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
}

/// `GET /api/admin/users`
pub async fn users(State(state): State<AppState>) -> Json<Vec<UserSummary>> {
    Json(state.auth().list_users().await)
}

/// `DELETE /api/admin/users/{email}`
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Persisted<Value>> {
    let durability = state.auth().delete_user(&email).await?;
    Ok(Persisted::new(
        json!({ "message": "User deleted successfully" }),
        durability,
    ))
}

/// `GET /api/admin/orders`
pub async fn orders(State(state): State<AppState>) -> Json<Vec<Order>> {
    Json(state.orders().list_all().await)
}

/// `PUT /api/admin/orders/{id}`
#[instrument(skip_all)]
pub async fn update_order(
    State(state): State<AppState>,
    id: std::result::Result<Path<i32>, PathRejection>,
    payload: std::result::Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let status: OrderStatus = request
        .status
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(AppError::BadRequest)?;

    let durability = state
        .orders()
        .update_status(OrderId::new(id), status)
        .await?;

    Ok(Persisted::new(
        json!({ "message": "Order status updated" }),
        durability,
    ))
}

/// `POST /api/admin/products`
#[instrument(skip_all)]
pub async fn add_product(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Json(input) = payload?;
    let (product, durability) = state.catalog().add(input).await?;

    Ok(Persisted::new(
        json!({ "message": "Product added successfully", "product": product }),
        durability,
    ))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Json(input) = payload?;
    let (product, durability) = state
        .catalog()
        .update(&ProductId::new(id), input)
        .await?;

    Ok(Persisted::new(
        json!({ "message": "Product updated successfully", "product": product }),
        durability,
    ))
}

/// `DELETE /api/admin/products/{id}`
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Persisted<Value> {
    let durability = state.catalog().delete(&ProductId::new(id)).await;
    Persisted::new(
        json!({ "message": "Product deleted successfully" }),
        durability,
    )
}
