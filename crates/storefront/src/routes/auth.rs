//! Authentication route handlers.
//!
//! Accounts are identified by email; there are no sessions or tokens, the
//! frontend keeps the returned profile.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::Persisted;
use crate::error::{Result, set_sentry_user};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "current_password")]
    pub current_password: String,
    #[serde(default, alias = "new_password")]
    pub new_password: String,
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Json(request) = payload?;
    let (user, durability) = state
        .auth()
        .register(&request.name, &request.email, &request.password)
        .await?;

    Ok(Persisted::new(
        json!({ "message": "User registered successfully", "user": user }),
        durability,
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    let user = state.auth().login(&request.email, &request.password).await?;
    set_sentry_user(user.email.as_str());

    Ok(Json(json!({ "message": "Login successful", "user": user })))
}

/// `POST /api/auth/change-password`
pub async fn change_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Persisted<Value>> {
    let Json(request) = payload?;
    let durability = state
        .auth()
        .change_password(
            &request.email,
            &request.current_password,
            &request.new_password,
        )
        .await?;

    Ok(Persisted::new(
        json!({ "message": "Password changed successfully" }),
        durability,
    ))
}
