//! Payment route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::Persisted;
use crate::error::Result;
use crate::services::payments::{PaymentRecord, UserPayment};
use crate::state::AppState;

/// Header carrying the webhook body's HMAC-SHA512.
const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub reference: Option<String>,
}

/// `POST /api/payment/verify`
pub async fn verify(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Json(request) = payload?;
    let verified = state
        .payments()
        .verify(request.reference.as_deref().unwrap_or_default())
        .await?;

    let message = if verified.test_mode {
        "Payment verified (test mode)"
    } else {
        "Payment verified and order confirmed"
    };
    Ok(Persisted::new(
        json!({ "message": message, "order": verified.order, "status": "success" }),
        verified.durability,
    ))
}

/// `POST /api/payment/webhook`
///
/// Takes the raw body so the signature is checked over the exact bytes sent.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = state.payments().webhook(&body, signature).await?;
    Ok(Json(json!({ "status": outcome.as_str() })))
}

/// `GET /api/payments/history/all`
pub async fn history_all(State(state): State<AppState>) -> Json<Vec<PaymentRecord>> {
    Json(state.payments().history_all().await)
}

/// `GET /api/payments/history/{email}`
pub async fn history_for(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Json<Vec<UserPayment>> {
    Json(state.payments().history_for(&email).await)
}
