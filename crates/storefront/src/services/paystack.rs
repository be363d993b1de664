//! Paystack API client for transaction verification and webhook signatures.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha512;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use bestmarket_core::pricing::kobo_to_naira;

use crate::config::PaystackConfig;

/// Request timeout for gateway calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when interacting with the Paystack API.
#[derive(Debug, Error)]
pub enum PaystackError {
    /// No secret key is configured.
    #[error("Paystack secret key is not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the request or parse the response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Body of `GET /transaction/verify/{reference}`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    /// Whether the API call itself succeeded.
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Transaction>,
}

impl VerifyResponse {
    /// The settled transaction, if the gateway reports `status: true` and a
    /// transaction status of `success`.
    #[must_use]
    pub fn successful(&self) -> Option<&Transaction> {
        self.data
            .as_ref()
            .filter(|tx| self.status && tx.status == "success")
    }

    /// Transaction status as reported, or `unknown`.
    #[must_use]
    pub fn transaction_status(&self) -> &str {
        self.data.as_ref().map_or("unknown", |tx| tx.status.as_str())
    }
}

/// A Paystack transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub status: String,
    /// Amount in kobo.
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub customer: Option<TransactionCustomer>,
}

impl Transaction {
    /// Amount in whole naira, rounded from kobo.
    #[must_use]
    pub fn amount_naira(&self) -> i64 {
        kobo_to_naira(self.amount)
    }

    /// Customer email, if the gateway sent one.
    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.email.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionCustomer {
    #[serde(default)]
    pub email: Option<String>,
}

/// Paystack API client.
#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: Url,
    secret_key: Option<SecretString>,
    webhook_secret: Option<SecretString>,
}

impl PaystackClient {
    /// Create a new Paystack API client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client fails to build.
    pub fn new(config: &PaystackConfig) -> Result<Self, PaystackError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| PaystackError::Parse(format!("Invalid base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    /// Verify a transaction by reference.
    ///
    /// # Errors
    ///
    /// Returns `PaystackError::NotConfigured` without a secret key,
    /// `PaystackError::Api` on a non-2xx response, and `Http`/`Parse` on
    /// transport or decoding failures.
    #[instrument(skip(self))]
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyResponse, PaystackError> {
        let secret = self.secret_key.as_ref().ok_or(PaystackError::NotConfigured)?;
        let url = self.verify_url(reference)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(secret.expose_secret())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaystackError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| PaystackError::Parse(e.to_string()))?;

        debug!(
            api_status = body.status,
            transaction_status = body.transaction_status(),
            "Paystack verification response"
        );

        Ok(body)
    }

    /// Check an `x-paystack-signature` header against the raw webhook body.
    ///
    /// Always passes when no webhook secret is configured.
    #[must_use]
    pub fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return true;
        };
        let Some(signature) = signature else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(secret.expose_secret().as_bytes()) else {
            return false;
        };
        mac.update(body);
        let expected = hex::encode(mac.finalize().into_bytes());

        constant_time_compare(&expected, &signature.trim().to_ascii_lowercase())
    }

    /// `{base}/transaction/verify/{reference}`, with the reference encoded as
    /// a single path segment.
    fn verify_url(&self, reference: &str) -> Result<Url, PaystackError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PaystackError::Parse("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["transaction", "verify", reference]);
        Ok(url)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(webhook_secret: Option<&str>) -> PaystackClient {
        PaystackClient::new(&PaystackConfig {
            base_url: "https://api.paystack.co".to_string(),
            secret_key: Some(SecretString::from("sk_test_x".to_owned())),
            webhook_secret: webhook_secret.map(|s| SecretString::from(s.to_owned())),
            accept_test_references: true,
        })
        .unwrap()
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }

    #[test]
    fn test_verify_url_encodes_reference() {
        let client = client(None);
        let url = client.verify_url("BMP_123").unwrap();
        assert_eq!(url.as_str(), "https://api.paystack.co/transaction/verify/BMP_123");

        let url = client.verify_url("a/b?c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.paystack.co/transaction/verify/a%2Fb%3Fc"
        );
    }

    #[test]
    fn test_signature_without_secret_always_passes() {
        let client = client(None);
        assert!(client.verify_signature(b"{}", None));
    }

    #[test]
    fn test_signature_verification() {
        let client = client(Some("whsec"));
        let body = br#"{"event":"charge.success"}"#;
        let signature = sign("whsec", body);

        assert!(client.verify_signature(body, Some(&signature)));
        assert!(client.verify_signature(body, Some(&signature.to_uppercase())));
        assert!(!client.verify_signature(body, Some(&sign("other", body))));
        assert!(!client.verify_signature(b"{}", Some(&signature)));
        assert!(!client.verify_signature(body, None));
    }

    #[test]
    fn test_verify_response_success_detection() {
        let body: VerifyResponse = serde_json::from_value(serde_json::json!({
            "status": true,
            "message": "Verification successful",
            "data": {
                "status": "success",
                "amount": 2_550_000,
                "reference": "BMP_1",
                "customer": { "email": "buyer@example.com" }
            }
        }))
        .unwrap();

        let tx = body.successful().unwrap();
        assert_eq!(tx.amount_naira(), 25_500);
        assert_eq!(tx.customer_email(), Some("buyer@example.com"));

        let odd: VerifyResponse = serde_json::from_value(serde_json::json!({
            "status": true,
            "data": { "status": "success", "amount": 12_350, "reference": "BMP_2" }
        }))
        .unwrap();
        assert_eq!(odd.successful().unwrap().amount_naira(), 124);

        let failed: VerifyResponse = serde_json::from_value(serde_json::json!({
            "status": true,
            "data": { "status": "abandoned" }
        }))
        .unwrap();
        assert!(failed.successful().is_none());
        assert_eq!(failed.transaction_status(), "abandoned");

        let empty: VerifyResponse =
            serde_json::from_value(serde_json::json!({ "status": false })).unwrap();
        assert_eq!(empty.transaction_status(), "unknown");
    }
}
