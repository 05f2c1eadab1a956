//! `SqliteOrderStore` is the concrete [`OrderStore`] backend.
//!
//! It uses SQLite via sqlx. The compare-and-swap is a single conditional `UPDATE … WHERE id = ? AND version = ?`,
//! which SQLite executes atomically, so no explicit locking is needed anywhere in the engine.

use std::fmt::Debug;

use sqlx::{
    migrate,
    sqlite::{SqlitePool, SqlitePoolOptions},
};

use super::orders;
use crate::{
    db_types::{NewAnomaly, NewOrder, Order, OrderId, ReconciliationAnomaly},
    traits::{OrderStore, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteOrderStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteOrderStore ({:?})", self.pool)
    }
}

impl SqliteOrderStore {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, OrderStoreError> {
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), OrderStoreError> {
        migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| OrderStoreError::DatabaseError(e.to_string()))
    }
}

impl OrderStore for SqliteOrderStore {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_customer(customer_id, &mut conn).await
    }

    async fn fetch_orders_for_restaurant(&self, restaurant_id: &str) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_restaurant(restaurant_id, &mut conn).await
    }

    async fn compare_and_swap(&self, order: &Order, expected_version: i64) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::compare_and_swap(order, expected_version, &mut conn).await
    }

    async fn record_anomaly(&self, anomaly: NewAnomaly) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::record_anomaly(anomaly, &mut conn).await
    }

    async fn fetch_anomalies(&self) -> Result<Vec<ReconciliationAnomaly>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_anomalies(&mut conn).await
    }
}
