//! Order route handlers.

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

use bestmarket_core::{OrderId, SessionId};

use super::Persisted;
use crate::error::{AppError, Result};
use crate::models::{CustomerInfo, Order};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub customer_info: Option<CustomerInfo>,
    #[serde(default)]
    pub delivery_address: Option<Value>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// `POST /api/orders`
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Json(request) = payload?;
    let session = request
        .session_id
        .as_deref()
        .and_then(SessionId::parse)
        .ok_or_else(|| AppError::bad_request("Session ID required"))?;

    let (order, durability) = state
        .orders()
        .create(
            &session,
            request.customer_info.unwrap_or_default(),
            request.delivery_address.unwrap_or_else(|| json!({})),
            request.promo_code.as_deref(),
        )
        .await?;

    Ok(Persisted::new(
        json!({ "message": "Order created successfully", "order": order }),
        durability,
    ))
}

/// `GET /api/orders/user/{email}`
pub async fn for_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Json<Vec<Order>> {
    Json(state.orders().list_for_user(&email).await)
}

/// `PUT /api/orders/{id}/cancel`
#[instrument(skip_all)]
pub async fn cancel(
    State(state): State<AppState>,
    id: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Persisted<Value>> {
    let Path(id) = id?;
    let (order, durability) = state.orders().cancel(OrderId::new(id)).await?;

    Ok(Persisted::new(
        json!({ "message": "Order cancelled successfully", "order": order }),
        durability,
    ))
}
