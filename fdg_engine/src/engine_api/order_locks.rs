//! Per-order mutual exclusion.
//!
//! Every mutation of an order runs while holding that order's lock, so that writes to one order are serialised and the
//! change notifications that follow them go out in commit order. Different orders never contend.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db_types::OrderId;

type LockTable = HashMap<OrderId, Arc<AsyncMutex<()>>>;

#[derive(Clone, Default)]
pub struct OrderLocks {
    table: Arc<Mutex<LockTable>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`. The lock is held until the returned guard is dropped.
    pub async fn lock(&self, order_id: &OrderId) -> OrderLockGuard {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table.entry(order_id.clone()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        OrderLockGuard { order_id: order_id.clone(), table: Arc::clone(&self.table), _guard: guard }
    }

    /// The number of orders that currently have a holder or waiters.
    pub fn active_count(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct OrderLockGuard {
    order_id: OrderId,
    table: Arc<Mutex<LockTable>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the table, one held by our guard. Anything more is a waiter.
        let idle = table.get(&self.order_id).map(|m| Arc::strong_count(m) <= 2).unwrap_or(false);
        if idle {
            table.remove(&self.order_id);
        }
    }
}
