//! Newsletter subscription route handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::Persisted;
use crate::error::Result;
use crate::services::newsletter::Subscription;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

/// `POST /api/newsletter/subscribe`
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;

    Ok(match state.newsletter().subscribe(&request.email).await? {
        Subscription::Subscribed(durability) => Persisted::new(
            json!({ "message": "Successfully subscribed to newsletter!" }),
            durability,
        )
        .into_response(),
        Subscription::AlreadySubscribed => {
            Json(json!({ "message": "Email already subscribed" })).into_response()
        }
    })
}
