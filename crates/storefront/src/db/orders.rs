//! Order queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use bestmarket_core::{OrderId, OrderStatus, PaymentStatus};

use super::RepositoryError;
use crate::models::{CartLine, NewOrder, Order};

const ORDER_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, \
     delivery_address, items, subtotal, discount, tax, shipping, total, status, \
     payment_reference, payment_status, amount, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    delivery_address: serde_json::Value,
    items: Json<Vec<CartLine>>,
    subtotal: i64,
    discount: i64,
    tax: i64,
    shipping: i64,
    total: i64,
    status: String,
    payment_reference: Option<String>,
    payment_status: Option<String>,
    amount: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        let payment_status = row
            .payment_status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            delivery_address: row.delivery_address,
            items: row.items.0,
            subtotal: row.subtotal,
            discount: row.discount,
            tax: row.tax,
            shipping: row.shipping,
            total: row.total,
            status,
            payment_reference: row.payment_reference,
            payment_status,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

/// Insert an order; the database assigns its ID.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn insert_order(pool: &PgPool, order: &NewOrder) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO storefront.orders (
            customer_name, customer_email, customer_phone, delivery_address, items,
            subtotal, discount, tax, shipping, total, status,
            payment_reference, payment_status, amount, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order.customer.name.as_deref())
    .bind(order.customer.email.as_deref())
    .bind(order.customer.phone.as_deref())
    .bind(&order.delivery_address)
    .bind(Json(&order.items))
    .bind(order.totals.subtotal)
    .bind(order.totals.discount)
    .bind(order.totals.tax)
    .bind(order.totals.shipping)
    .bind(order.totals.total)
    .bind(order.status.as_str())
    .bind(order.payment_reference.as_deref())
    .bind(order.payment_status.map(PaymentStatus::as_str))
    .bind(order.amount)
    .bind(order.created_at)
    .fetch_one(pool)
    .await?;

    Order::try_from(row)
}

/// List every order, newest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>, RepositoryError> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM storefront.orders ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Order::try_from)
    .collect()
}

/// List the orders placed with `email`, newest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_orders_for_email(
    pool: &PgPool,
    email: &str,
) -> Result<Vec<Order>, RepositoryError> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM storefront.orders \
         WHERE lower(customer_email) = lower($1) \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(email.trim())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Order::try_from)
    .collect()
}

/// Get an order by ID.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_order(pool: &PgPool, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Order::try_from).transpose()
}

/// Set the status of an order.
///
/// Returns `true` if the order exists.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn update_status(
    pool: &PgPool,
    id: OrderId,
    status: OrderStatus,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE storefront.orders SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark the orders carrying a payment reference as confirmed and paid.
///
/// Returns `true` if any order matched.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_paid(pool: &PgPool, reference: &str) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.orders
        SET status = $2, payment_status = $3
        WHERE payment_reference = $1
        ",
    )
    .bind(reference)
    .bind(OrderStatus::Confirmed.as_str())
    .bind(PaymentStatus::Completed.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
