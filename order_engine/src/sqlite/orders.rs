//! Row-level order queries. These functions take a connection so they can be composed inside transactions by the
//! store; nothing here is public outside the sqlite module.

use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{
        NewAnomaly,
        NewOrder,
        Order,
        OrderId,
        OrderStatus,
        PaymentPhase,
        PaymentSessionRef,
        ReconciliationAnomaly,
        StatusMessage,
    },
    traits::OrderStoreError,
};

//--------------------------------------      OrderRow         -------------------------------------------------------
/// The flat shape of an order row. Conversion into [`Order`] parses the JSON columns and status strings; a row that
/// fails to parse is surfaced as [`OrderStoreError::CorruptRecord`] rather than silently dropped.
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: String,
    restaurant_id: String,
    customer_id: String,
    cart_items: String,
    delivery_details: String,
    delivery_fee: i64,
    total_amount: i64,
    status: String,
    payment_phase: Option<String>,
    rejection_message: Option<String>,
    rejection_at: Option<DateTime<Utc>>,
    resolution_message: Option<String>,
    resolution_at: Option<DateTime<Utc>>,
    payment_session_id: Option<String>,
    payment_session_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = OrderStoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, detail: String| OrderStoreError::CorruptRecord(format!("{what}: {detail}"));
        let status =
            row.status.parse::<OrderStatus>().map_err(|e| corrupt("status", e.to_string()))?;
        let payment_phase = row
            .payment_phase
            .map(|p| p.parse::<PaymentPhase>())
            .transpose()
            .map_err(|e| corrupt("payment_phase", e.to_string()))?;
        let cart_items =
            serde_json::from_str(&row.cart_items).map_err(|e| corrupt("cart_items", e.to_string()))?;
        let delivery_details = serde_json::from_str(&row.delivery_details)
            .map_err(|e| corrupt("delivery_details", e.to_string()))?;
        let rejection_message = match (row.rejection_message, row.rejection_at) {
            (Some(text), Some(timestamp)) => Some(StatusMessage { text, timestamp }),
            (Some(text), None) => Some(StatusMessage { text, timestamp: row.updated_at }),
            _ => None,
        };
        let resolution_message = match (row.resolution_message, row.resolution_at) {
            (Some(text), Some(timestamp)) => Some(StatusMessage { text, timestamp }),
            (Some(text), None) => Some(StatusMessage { text, timestamp: row.updated_at }),
            _ => None,
        };
        let payment_session = match (row.payment_session_id, row.payment_session_url) {
            (Some(session_id), Some(redirect_url)) => Some(PaymentSessionRef { session_id, redirect_url }),
            _ => None,
        };
        Ok(Order {
            id: OrderId(row.id),
            restaurant_id: row.restaurant_id,
            customer_id: row.customer_id,
            cart_items,
            delivery_details,
            delivery_fee: row.delivery_fee.into(),
            total_amount: row.total_amount.into(),
            status,
            payment_phase,
            rejection_message,
            resolution_message,
            payment_session,
            created_at: row.created_at,
            updated_at: row.updated_at,
            delivered_at: row.delivered_at,
            version: row.version,
        })
    }
}

//--------------------------------------      Queries          -------------------------------------------------------
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let id = OrderId::random();
    let now = Utc::now();
    let cart_items = serde_json::to_string(&order.cart_items)
        .map_err(|e| OrderStoreError::DatabaseError(e.to_string()))?;
    let delivery_details = serde_json::to_string(&order.delivery_details)
        .map_err(|e| OrderStoreError::DatabaseError(e.to_string()))?;
    // The row stream must be drained to completion. Dropping it early makes the sqlite driver cancel the
    // statement, which rolls the INSERT back even though a row was already yielded.
    let rows: Vec<OrderRow> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                restaurant_id,
                customer_id,
                cart_items,
                delivery_details,
                delivery_fee,
                total_amount,
                status,
                created_at,
                updated_at,
                version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1)
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(order.restaurant_id)
    .bind(order.customer_id)
    .bind(cart_items)
    .bind(delivery_details)
    .bind(order.delivery_fee.value())
    .bind(order.total_amount.value())
    .bind(OrderStatus::Placed.to_string())
    .bind(now)
    .bind(now)
    .fetch_all(conn)
    .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| OrderStoreError::DatabaseError(format!("Insert of order {id} returned no row")))?;
    debug!("📝️ Order {id} inserted");
    row.try_into()
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

pub async fn fetch_orders_for_customer(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, OrderStoreError> {
    let rows: Vec<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC")
            .bind(customer_id)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(Order::try_from).collect()
}

pub async fn fetch_orders_for_restaurant(
    restaurant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, OrderStoreError> {
    let rows: Vec<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE restaurant_id = $1 ORDER BY created_at DESC")
            .bind(restaurant_id)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(Order::try_from).collect()
}

/// The conditional write at the heart of the store. Only the mutable columns are written; the cart snapshot,
/// delivery details, ownership references and `created_at` are fixed at insert time and cannot be changed here.
pub async fn compare_and_swap(
    order: &Order,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    // Drained to completion for the same reason as [`insert_order`]: an undrained RETURNING stream cancels the
    // statement and the UPDATE never commits.
    let rows: Vec<OrderRow> = sqlx::query_as(
        r#"
            UPDATE orders SET
                total_amount = $1,
                status = $2,
                payment_phase = $3,
                rejection_message = $4,
                rejection_at = $5,
                resolution_message = $6,
                resolution_at = $7,
                payment_session_id = $8,
                payment_session_url = $9,
                delivered_at = $10,
                updated_at = $11,
                version = version + 1
            WHERE id = $12 AND version = $13
            RETURNING *;
        "#,
    )
    .bind(order.total_amount.value())
    .bind(order.status.to_string())
    .bind(order.payment_phase.map(|p| p.to_string()))
    .bind(order.rejection_message.as_ref().map(|m| m.text.clone()))
    .bind(order.rejection_message.as_ref().map(|m| m.timestamp))
    .bind(order.resolution_message.as_ref().map(|m| m.text.clone()))
    .bind(order.resolution_message.as_ref().map(|m| m.timestamp))
    .bind(order.payment_session.as_ref().map(|s| s.session_id.clone()))
    .bind(order.payment_session.as_ref().map(|s| s.redirect_url.clone()))
    .bind(order.delivered_at)
    .bind(Utc::now())
    .bind(order.id.as_str())
    .bind(expected_version)
    .fetch_all(&mut *conn)
    .await?;
    match rows.into_iter().next() {
        Some(row) => row.try_into(),
        None => {
            // Zero rows: either the version moved, or the order never existed. Disambiguate for the caller.
            match fetch_order(&order.id, conn).await? {
                Some(_) => Err(OrderStoreError::Conflict),
                None => Err(OrderStoreError::OrderNotFound(order.id.clone())),
            }
        },
    }
}

//--------------------------------------     Anomalies         -------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
struct AnomalyRow {
    id: i64,
    order_id: String,
    event_id: String,
    event_type: String,
    order_status: String,
    amount: Option<i64>,
    note: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AnomalyRow> for ReconciliationAnomaly {
    type Error = OrderStoreError;

    fn try_from(row: AnomalyRow) -> Result<Self, Self::Error> {
        let order_status = row
            .order_status
            .parse::<OrderStatus>()
            .map_err(|e| OrderStoreError::CorruptRecord(format!("order_status: {e}")))?;
        Ok(ReconciliationAnomaly {
            id: row.id,
            order_id: OrderId(row.order_id),
            event_id: row.event_id,
            event_type: row.event_type,
            order_status,
            amount: row.amount.map(Into::into),
            note: row.note,
            created_at: row.created_at,
        })
    }
}

pub async fn record_anomaly(anomaly: NewAnomaly, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    sqlx::query(
        r#"
            INSERT INTO reconciliation_anomalies (
                order_id, event_id, event_type, order_status, amount, note, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7);
        "#,
    )
    .bind(anomaly.order_id.as_str())
    .bind(anomaly.event_id)
    .bind(anomaly.event_type)
    .bind(anomaly.order_status.to_string())
    .bind(anomaly.amount.map(|a| a.value()))
    .bind(anomaly.note)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_anomalies(conn: &mut SqliteConnection) -> Result<Vec<ReconciliationAnomaly>, OrderStoreError> {
    let rows: Vec<AnomalyRow> =
        sqlx::query_as("SELECT * FROM reconciliation_anomalies ORDER BY created_at DESC").fetch_all(conn).await?;
    rows.into_iter().map(ReconciliationAnomaly::try_from).collect()
}
