//! `SqliteDatabase` is a concrete storage backend for the order lifecycle engine.
//!
//! Each mutating call is a single conditional `UPDATE`, so SQLite itself arbitrates between competing writers, whether
//! they live in this process or another one.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::{
    db::{db_url, new_pool, orders},
    SqliteDatabaseError,
};
use crate::{
    db_types::{Feedback, NewOrder, Order, OrderId, OrderStatusType, PaymentSettlement},
    engine_api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
    traits::{DeliveryDatabase, OrderManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl DeliveryDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        Ok(order)
    }

    async fn compare_and_set_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::compare_and_set_status(order_id, expected, new_status, &mut conn).await?;
        match &result {
            Some(_) => debug!("🗃️ Order [{order_id}] moved from {expected} to {new_status}"),
            None => debug!("🗃️ Order [{order_id}] was not {expected}. Status left unchanged"),
        }
        Ok(result)
    }

    async fn set_rider_code_if_absent(&self, order_id: &OrderId, code: &str) -> Result<bool, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let written = orders::set_rider_code_if_absent(order_id, code, &mut conn).await?;
        trace!("🗃️ Rider code write for [{order_id}] applied: {written}");
        Ok(written)
    }

    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        settlement: &PaymentSettlement,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::mark_order_paid(order_id, settlement, &mut conn).await?;
        if result.is_some() {
            debug!("🗃️ Order [{order_id}] marked as paid. Reference {}", settlement.reference);
        }
        Ok(result)
    }

    async fn save_feedback(&self, order_id: &OrderId, feedback: &Feedback) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::save_feedback(order_id, feedback, &mut conn).await?;
        Ok(result)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `FDG_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
