//! In-memory transactional store.
//!
//! Rows live in `DashMap`s. A [`Transaction`] stages every write locally and
//! applies them in one synchronous step on commit, so a dropped transaction
//! (error, timeout, cancelled request) leaves the tables untouched.
//!
//! Writers coordinate through two kinds of locks, always taken in this order:
//! per-courier locks in ascending id order, then the order-pool lock that
//! guards claiming unassigned orders. A commit gate keeps readers from
//! observing a commit halfway through.

mod transaction;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::AppError;
use crate::models::batch::{Batch, BatchId};
use crate::models::courier::{Courier, CourierId};
use crate::models::order::{DeliveryOrder, OrderId};

pub use transaction::{HeldLocks, Transaction};

pub struct Store {
    couriers: DashMap<CourierId, Courier>,
    orders: DashMap<OrderId, DeliveryOrder>,
    batches: DashMap<BatchId, Batch>,
    next_batch_id: AtomicU64,
    courier_locks: DashMap<CourierId, Arc<Mutex<()>>>,
    order_pool_lock: Arc<Mutex<()>>,
    commit_gate: RwLock<()>,
    lock_timeout: Duration,
}

impl Store {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            couriers: DashMap::new(),
            orders: DashMap::new(),
            batches: DashMap::new(),
            next_batch_id: AtomicU64::new(1),
            courier_locks: DashMap::new(),
            order_pool_lock: Arc::new(Mutex::new(())),
            commit_gate: RwLock::new(()),
            lock_timeout,
        }
    }

    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    pub fn courier_count(&self) -> usize {
        self.couriers.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Drops the lock entries of `ids` that belong to no registered courier
    /// and that no transaction holds or waits on.
    pub fn release_unused_courier_locks(&self, ids: &[CourierId]) {
        for id in ids {
            self.courier_locks.remove_if(id, |id, lock| {
                Arc::strong_count(lock) == 1 && !self.couriers.contains_key(id)
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn courier_lock_count(&self) -> usize {
        self.courier_locks.len()
    }

    fn allocate_batch_id(&self) -> BatchId {
        self.next_batch_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn acquire(&self, lock: Arc<Mutex<()>>, what: &str) -> Result<OwnedMutexGuard<()>, AppError> {
        tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                AppError::Conflict(format!(
                    "timed out after {:?} waiting for {what}",
                    self.lock_timeout
                ))
            })
    }

    async fn lock_courier(&self, id: CourierId) -> Result<OwnedMutexGuard<()>, AppError> {
        let lock = self.courier_locks.entry(id).or_default().clone();
        self.acquire(lock, &format!("courier {id}")).await
    }

    async fn lock_order_pool(&self) -> Result<OwnedMutexGuard<()>, AppError> {
        self.acquire(self.order_pool_lock.clone(), "order pool").await
    }

    // The gate guards no data, so a poisoned lock is still usable.
    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.commit_gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.commit_gate.write().unwrap_or_else(PoisonError::into_inner)
    }
}
