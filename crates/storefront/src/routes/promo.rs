//! Promo code validation.

use axum::{
    Json,
    extract::rejection::JsonRejection,
};
use serde::Deserialize;
use serde_json::{Value, json};

use bestmarket_core::Promo;

use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    #[serde(default)]
    pub code: String,
}

/// `POST /api/promo/validate`
pub async fn validate(
    payload: std::result::Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    Ok(Json(describe(Promo::lookup(&request.code).as_ref())))
}

fn describe(promo: Option<&Promo>) -> Value {
    match promo {
        Some(promo) => json!({
            "valid": true,
            "discount": promo.kind.value(),
            "type": promo.kind.type_name(),
            "description": promo.description,
            "message": format!("Promo code applied! {}", promo.description),
        }),
        None => json!({ "valid": false, "message": "Invalid promo code" }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_valid_code() {
        let body = describe(Promo::lookup("234567").as_ref());
        assert_eq!(body["valid"], true);
        assert_eq!(body["discount"], 10);
        assert_eq!(body["type"], "percentage");
        assert_eq!(body["message"], "Promo code applied! 10% off your order");
    }

    #[test]
    fn test_describe_invalid_code() {
        let body = describe(Promo::lookup("nope").as_ref());
        assert_eq!(body, json!({ "valid": false, "message": "Invalid promo code" }));
    }
}
