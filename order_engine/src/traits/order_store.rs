use thiserror::Error;

use crate::db_types::{NewAnomaly, NewOrder, Order, OrderId, ReconciliationAnomaly};

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The order version on record has changed; re-read and retry")]
    Conflict,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Stored order record is corrupt: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Durable storage for order records.
///
/// [`Self::compare_and_swap`] is the only sanctioned path for mutating an existing order. Callers read the current
/// record, mutate a copy in memory, and hand the copy back together with the version they read. The store rejects
/// the write with [`OrderStoreError::Conflict`] if the version on record has since moved, forcing the caller to
/// re-read and decide whether its intended mutation is still legal. With every mutation path funnelled through this
/// call, the store is the per-order serialization point; no other locking is needed.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Persists a brand-new order, assigning its id and setting `version` to 1.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Fetches the order with the given id, or `None` if it does not exist.
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// All orders placed by the given customer, newest first.
    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderStoreError>;

    /// All orders destined for the given restaurant, newest first.
    async fn fetch_orders_for_restaurant(&self, restaurant_id: &str) -> Result<Vec<Order>, OrderStoreError>;

    /// Writes the mutated order back, iff the stored version still equals `expected_version`.
    ///
    /// On success the stored version is bumped to `expected_version + 1` and `updated_at` is refreshed; the
    /// returned record reflects both. A moved version yields [`OrderStoreError::Conflict`]; a missing row yields
    /// [`OrderStoreError::OrderNotFound`].
    async fn compare_and_swap(&self, order: &Order, expected_version: i64) -> Result<Order, OrderStoreError>;

    /// Records a reconciliation anomaly for operator follow-up.
    async fn record_anomaly(&self, anomaly: NewAnomaly) -> Result<(), OrderStoreError>;

    /// All recorded anomalies, newest first.
    async fn fetch_anomalies(&self) -> Result<Vec<ReconciliationAnomaly>, OrderStoreError>;
}
