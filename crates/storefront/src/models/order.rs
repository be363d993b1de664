//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bestmarket_core::{OrderId, OrderStatus, PaymentStatus, Totals};

use super::CartLine;

/// Customer contact details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// An order before either store has assigned it an ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer: CustomerInfo,
    pub delivery_address: serde_json::Value,
    pub items: Vec<CartLine>,
    pub totals: Totals,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    /// Amount reported by the payment gateway, for gateway-created orders.
    pub amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// A checkout order for the given cart lines.
    #[must_use]
    pub fn checkout(
        customer: CustomerInfo,
        delivery_address: serde_json::Value,
        items: Vec<CartLine>,
        totals: Totals,
    ) -> Self {
        Self {
            customer,
            delivery_address,
            items,
            totals,
            status: OrderStatus::Confirmed,
            payment_reference: None,
            payment_status: None,
            amount: None,
            created_at: Utc::now(),
        }
    }

    /// An order recorded from a payment gateway settlement.
    #[must_use]
    pub fn from_payment(
        reference: &str,
        customer_email: String,
        amount: i64,
        status: OrderStatus,
    ) -> Self {
        Self {
            customer: CustomerInfo {
                email: Some(customer_email),
                ..CustomerInfo::default()
            },
            delivery_address: serde_json::Value::String("Address will be updated".to_owned()),
            items: Vec::new(),
            totals: Totals::default(),
            status,
            payment_reference: Some(reference.to_owned()),
            payment_status: Some(PaymentStatus::Completed),
            amount: Some(amount),
            created_at: Utc::now(),
        }
    }

    /// Attach an ID.
    #[must_use]
    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            customer_name: self.customer.name,
            customer_email: self.customer.email,
            customer_phone: self.customer.phone,
            delivery_address: self.delivery_address,
            items: self.items,
            subtotal: self.totals.subtotal,
            discount: self.totals.discount,
            tax: self.totals.tax,
            shipping: self.totals.shipping,
            total: self.totals.total,
            status: self.status,
            payment_reference: self.payment_reference,
            payment_status: self.payment_status,
            amount: self.amount,
            created_at: self.created_at,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: serde_json::Value,
    pub items: Vec<CartLine>,
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order belongs to `email` (case-insensitive).
    #[must_use]
    pub fn is_for(&self, email: &str) -> bool {
        self.customer_email
            .as_deref()
            .is_some_and(|e| e.trim().eq_ignore_ascii_case(email.trim()))
    }

    /// Amount charged: the gateway amount for gateway orders, else the total.
    #[must_use]
    pub fn charged(&self) -> i64 {
        self.amount.unwrap_or(self.total)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_order_shape() {
        let order = NewOrder::from_payment(
            "BMP_123",
            "buyer@example.com".to_owned(),
            25_000,
            OrderStatus::Confirmed,
        )
        .with_id(OrderId::new(7));

        assert_eq!(order.payment_status, Some(PaymentStatus::Completed));
        assert_eq!(order.charged(), 25_000);
        assert!(order.items.is_empty());
        assert!(order.is_for("Buyer@Example.com"));
        assert!(!order.is_for("other@example.com"));
    }

    #[test]
    fn test_checkout_order_uses_totals() {
        let totals = Totals::compute(36_000, None);
        let order = NewOrder::checkout(
            CustomerInfo::default(),
            serde_json::json!({"city": "Lagos"}),
            Vec::new(),
            totals,
        )
        .with_id(OrderId::new(1));

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.total, totals.total);
        assert_eq!(order.charged(), totals.total);
        assert!(order.payment_reference.is_none());
    }

    #[test]
    fn test_order_serializes_status_lowercase() {
        let order = NewOrder::checkout(
            CustomerInfo::default(),
            serde_json::Value::Null,
            Vec::new(),
            Totals::default(),
        )
        .with_id(OrderId::new(3));
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["status"], "confirmed");
    }
}
