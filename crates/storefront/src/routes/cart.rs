//! Cart route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bestmarket_core::{ItemKey, ProductId, SessionId};

use super::Persisted;
use crate::error::{AppError, Result};
use crate::models::CartLine;
use crate::services::cart::CartSummary;
use crate::state::AppState;

/// A product ID sent as either `"3"` or `3`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Text(String),
    Number(u64),
}

impl From<ProductRef> for ProductId {
    fn from(value: ProductRef) -> Self {
        match value {
            ProductRef::Text(id) => Self::new(id.trim()),
            ProductRef::Number(id) => Self::new(id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductRef,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub item_key: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub item_key: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub promo: Option<String>,
}

fn session(raw: &str) -> Result<SessionId> {
    SessionId::parse(raw).ok_or_else(|| AppError::bad_request("Session ID required"))
}

fn item_key(raw: &str) -> Result<ItemKey> {
    ItemKey::parse(raw).map_err(|e| AppError::bad_request(format!("Invalid item key: {e}")))
}

/// `GET /api/cart/{session_id}`
pub async fn show(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<CartLine>>> {
    let session = session(&session_id)?;
    Ok(Json(state.cart().get(&session).await))
}

/// `GET /api/cart/{session_id}/summary`
pub async fn summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    query: std::result::Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<CartSummary>> {
    let session = session(&session_id)?;
    let Query(query) = query?;
    Ok(Json(
        state.cart().summary(&session, query.promo.as_deref()).await,
    ))
}

/// `POST /api/cart/{session_id}/add`
#[instrument(skip(state, payload))]
pub async fn add(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let session = session(&session_id)?;
    let Json(request) = payload?;

    let quantity = match request.quantity.unwrap_or(1) {
        q if q <= 0 => return Err(AppError::bad_request("Quantity must be at least 1")),
        q => u32::try_from(q).unwrap_or(u32::MAX),
    };

    let (cart, durability) = state
        .cart()
        .add(
            &session,
            &request.product_id.into(),
            quantity,
            request.color.as_deref(),
            request.size.as_deref(),
        )
        .await?;

    Ok(Persisted::new(
        json!({ "message": "Item added to cart", "cart": cart }),
        durability,
    ))
}

/// `PUT /api/cart/{session_id}/update`
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<UpdateCartRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let session = session(&session_id)?;
    let Json(request) = payload?;
    let key = item_key(&request.item_key)?;

    let (cart, durability) = state
        .cart()
        .update(&session, &key, request.quantity)
        .await?;

    Ok(Persisted::new(
        json!({ "message": "Cart updated", "cart": cart }),
        durability,
    ))
}

/// `DELETE /api/cart/{session_id}/remove`
#[instrument(skip(state, payload))]
pub async fn remove(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<RemoveFromCartRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let session = session(&session_id)?;
    let Json(request) = payload?;
    let key = item_key(&request.item_key)?;

    let (cart, durability) = state.cart().remove(&session, &key).await;

    Ok(Persisted::new(
        json!({ "message": "Item removed from cart", "cart": cart }),
        durability,
    ))
}

/// `DELETE /api/cart/{session_id}/clear`
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Persisted<Value>> {
    let session = session(&session_id)?;
    let cleared = state.cart().clear(&session).await;

    let body = if cleared.complete {
        json!({ "message": "Cart cleared successfully", "status": "success" })
    } else {
        json!({ "message": "Cart cleared (local only)", "status": "partial" })
    };
    Ok(Persisted::new(body, cleared.durability))
}
