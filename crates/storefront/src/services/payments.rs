//! Payment verification, webhooks and payment history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use bestmarket_core::{OrderId, OrderStatus, PaymentStatus};

use crate::models::{CartLine, NewOrder, Order};
use crate::services::orders::OrderService;
use crate::services::paystack::{PaystackClient, PaystackError};
use crate::store::{Durability, Store};

/// References with this prefix are generated by the storefront checkout.
const TEST_REFERENCE_PREFIX: &str = "BMP_";

/// Amount recorded for test references accepted without the gateway.
const TEST_AMOUNT: i64 = 10_000;

const TEST_CUSTOMER_EMAIL: &str = "test@example.com";

const PAYMENT_METHOD: &str = "Card";

/// Errors that can occur while handling payments.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment reference required")]
    MissingReference,

    /// The gateway answered with a non-2xx status.
    #[error("Paystack API error: {status} - {body}")]
    Gateway { status: u16, body: String },

    #[error("Payment not successful - Payment status: {0}")]
    NotSuccessful(String),

    /// The gateway could not be reached or configured.
    #[error("Verification error: {0}")]
    Unavailable(#[source] PaystackError),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// A verified payment and the order recorded for it.
#[derive(Debug, Clone)]
pub struct Verified {
    pub order: Order,
    /// Accepted from a test reference without the gateway's confirmation.
    pub test_mode: bool,
    pub durability: Durability,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Ignored,
}

impl WebhookOutcome {
    /// Status reported back to the gateway.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "success",
            Self::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    #[serde(default)]
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    #[serde(default)]
    reference: Option<String>,
}

/// One row of the admin payment history.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub reference: String,
    pub customer_email: Option<String>,
    pub amount: i64,
    pub status: &'static str,
    pub date: DateTime<Utc>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: &'static str,
}

/// One row of a customer's payment history.
#[derive(Debug, Clone, Serialize)]
pub struct UserPayment {
    pub reference: String,
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    pub amount: i64,
    pub status: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: &'static str,
    pub items: Vec<CartLine>,
}

impl From<Order> for UserPayment {
    fn from(order: Order) -> Self {
        let status = if order.payment_status == Some(PaymentStatus::Completed) {
            PaymentStatus::Completed.to_string()
        } else {
            order.status.to_string()
        };
        Self {
            reference: order
                .payment_reference
                .clone()
                .unwrap_or_else(|| format!("{TEST_REFERENCE_PREFIX}{}", order.id)),
            order_id: order.id,
            amount: order.charged(),
            status,
            date: order.created_at,
            payment_method: PAYMENT_METHOD,
            items: order.items,
        }
    }
}

/// Payment service.
pub struct PaymentService<'a> {
    store: &'a Store,
    paystack: &'a PaystackClient,
    accept_test_references: bool,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a Store,
        paystack: &'a PaystackClient,
        accept_test_references: bool,
    ) -> Self {
        Self {
            store,
            paystack,
            accept_test_references,
        }
    }

    /// Verify a transaction with the gateway and record a confirmed order.
    ///
    /// When the gateway cannot be reached, `BMP_` references are accepted as
    /// paid test orders if enabled.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::MissingReference` for a blank reference,
    /// `Gateway` for non-2xx gateway answers, `NotSuccessful` for unsettled
    /// transactions, and `Unavailable` when the gateway is unreachable.
    #[instrument(skip(self))]
    pub async fn verify(&self, reference: &str) -> Result<Verified, PaymentError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(PaymentError::MissingReference);
        }

        let orders = OrderService::new(self.store);

        match self.paystack.verify_transaction(reference).await {
            Ok(response) => {
                let tx = response.successful().ok_or_else(|| {
                    PaymentError::NotSuccessful(response.transaction_status().to_owned())
                })?;
                let (order, durability) = orders
                    .record_payment(NewOrder::from_payment(
                        reference,
                        tx.customer_email().unwrap_or_default().to_owned(),
                        tx.amount_naira(),
                        OrderStatus::Confirmed,
                    ))
                    .await;

                tracing::info!(reference, order_id = %order.id, %durability, "Payment verified");
                Ok(Verified {
                    order,
                    test_mode: false,
                    durability,
                })
            }
            Err(PaystackError::Api { status, message }) => Err(PaymentError::Gateway {
                status,
                body: message,
            }),
            Err(err) if self.accepts_test_reference(reference) => {
                tracing::warn!(
                    reference,
                    error = %err,
                    "Payment gateway unavailable, accepting test reference"
                );
                let (order, durability) = orders
                    .record_payment(NewOrder::from_payment(
                        reference,
                        TEST_CUSTOMER_EMAIL.to_owned(),
                        TEST_AMOUNT,
                        OrderStatus::Paid,
                    ))
                    .await;
                Ok(Verified {
                    order,
                    test_mode: true,
                    durability,
                })
            }
            Err(err) => Err(PaymentError::Unavailable(err)),
        }
    }

    /// Handle a gateway webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` if a webhook secret is
    /// configured and the signature does not match, and `InvalidPayload` if
    /// the body is not a usable event.
    #[instrument(skip_all)]
    pub async fn webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        if !self.paystack.verify_signature(body, signature) {
            return Err(PaymentError::InvalidSignature);
        }

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;
        if event.event != "charge.success" {
            tracing::debug!(event = %event.event, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        let reference = event
            .data
            .and_then(|d| d.reference)
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| PaymentError::InvalidPayload("missing data.reference".to_owned()))?;

        let matched = OrderService::new(self.store).mark_paid(&reference).await;
        tracing::info!(%reference, matched, "Charge succeeded");
        Ok(WebhookOutcome::Processed)
    }

    /// Every order carrying a payment reference.
    pub async fn history_all(&self) -> Vec<PaymentRecord> {
        OrderService::new(self.store)
            .list_all()
            .await
            .into_iter()
            .filter_map(|order| {
                let reference = order.payment_reference.clone()?;
                Some(PaymentRecord {
                    reference,
                    amount: order.charged(),
                    status: if order.payment_status == Some(PaymentStatus::Completed) {
                        PaymentStatus::Completed.as_str()
                    } else {
                        PaymentStatus::Pending.as_str()
                    },
                    date: order.created_at,
                    payment_method: PAYMENT_METHOD,
                    customer_email: order.customer_email,
                })
            })
            .collect()
    }

    /// A customer's orders as payments, newest first.
    pub async fn history_for(&self, email: &str) -> Vec<UserPayment> {
        let mut payments: Vec<UserPayment> = OrderService::new(self.store)
            .list_for_user(email)
            .await
            .into_iter()
            .map(UserPayment::from)
            .collect();
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        payments
    }

    fn accepts_test_reference(&self, reference: &str) -> bool {
        self.accept_test_references && reference.starts_with(TEST_REFERENCE_PREFIX)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha512;

    use super::*;
    use crate::config::PaystackConfig;
    use crate::store::LocalStore;

    fn store() -> Store {
        Store::new(None, LocalStore::in_memory(Vec::new()))
    }

    /// A client with no secret key, so every verification is unavailable.
    fn offline_client(webhook_secret: Option<&str>) -> PaystackClient {
        PaystackClient::new(&PaystackConfig {
            webhook_secret: webhook_secret.map(|s| SecretString::from(s.to_owned())),
            ..PaystackConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_requires_reference() {
        let store = store();
        let client = offline_client(None);
        let payments = PaymentService::new(&store, &client, true);
        assert!(matches!(
            payments.verify("  ").await,
            Err(PaymentError::MissingReference)
        ));
    }

    #[tokio::test]
    async fn test_test_reference_fallback() {
        let store = store();
        let client = offline_client(None);
        let payments = PaymentService::new(&store, &client, true);

        let verified = payments.verify("BMP_1700000000").await.unwrap();
        assert!(verified.test_mode);
        assert_eq!(verified.order.status, OrderStatus::Paid);
        assert_eq!(verified.order.amount, Some(TEST_AMOUNT));
        assert_eq!(
            verified.order.customer_email.as_deref(),
            Some(TEST_CUSTOMER_EMAIL)
        );
        assert_eq!(verified.durability, Durability::LocalOnly);

        assert!(matches!(
            payments.verify("T_123").await,
            Err(PaymentError::Unavailable(PaystackError::NotConfigured))
        ));
    }

    #[tokio::test]
    async fn test_fallback_can_be_disabled() {
        let store = store();
        let client = offline_client(None);
        let payments = PaymentService::new(&store, &client, false);
        assert!(matches!(
            payments.verify("BMP_1").await,
            Err(PaymentError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_webhook_marks_order_paid() {
        let store = store();
        let client = offline_client(None);
        let payments = PaymentService::new(&store, &client, true);

        let mut pending =
            NewOrder::from_payment("BMP_9", "a@example.com".to_owned(), 500, OrderStatus::Pending);
        pending.payment_status = None;
        let (order, _) = OrderService::new(&store).record_payment(pending).await;

        let body = br#"{"event":"charge.success","data":{"reference":"BMP_9","amount":50000}}"#;
        assert_eq!(
            payments.webhook(body, None).await.unwrap(),
            WebhookOutcome::Processed
        );
        let order = store.local().order(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, Some(PaymentStatus::Completed));

        let body = br#"{"event":"transfer.success","data":{}}"#;
        assert_eq!(
            payments.webhook(body, None).await.unwrap(),
            WebhookOutcome::Ignored
        );

        assert!(matches!(
            payments.webhook(br#"{"event":"charge.success","data":{}}"#, None).await,
            Err(PaymentError::InvalidPayload(_))
        ));
        assert!(matches!(
            payments.webhook(b"not json", None).await,
            Err(PaymentError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_webhook_signature_checked_when_configured() {
        let store = store();
        let client = offline_client(Some("whsec"));
        let payments = PaymentService::new(&store, &client, true);
        let body = br#"{"event":"charge.success","data":{"reference":"BMP_1"}}"#;

        assert!(matches!(
            payments.webhook(body, Some("deadbeef")).await,
            Err(PaymentError::InvalidSignature)
        ));

        let mut mac = Hmac::<Sha512>::new_from_slice(b"whsec").unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());
        assert_eq!(
            payments.webhook(body, Some(&signature)).await.unwrap(),
            WebhookOutcome::Processed
        );
    }

    #[tokio::test]
    async fn test_history() {
        let store = store();
        let client = offline_client(None);
        let payments = PaymentService::new(&store, &client, true);
        payments.verify("BMP_1").await.unwrap();
        payments.verify("BMP_2").await.unwrap();

        let all = payments.history_all().await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|p| p.status == "completed"));
        assert!(all.iter().all(|p| p.amount == TEST_AMOUNT));

        let mine = payments.history_for(TEST_CUSTOMER_EMAIL).await;
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].status, "completed");
        assert!(mine[0].date >= mine[1].date);
        assert!(payments.history_for("nobody@example.com").await.is_empty());
    }
}
