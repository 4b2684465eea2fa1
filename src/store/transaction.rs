use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::batch::{Batch, BatchId};
use crate::models::courier::{Courier, CourierId};
use crate::models::order::{DeliveryOrder, OrderId};

/// Locks a committed transaction still holds. They are released when this
/// value is dropped, so callers can publish what they committed before
/// another writer gets in.
pub struct HeldLocks {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// A unit of work against the [`Store`].
///
/// Reads see the transaction's own staged writes first, then committed rows.
/// Locks are held until the transaction is committed or dropped. Dropping
/// without calling [`Transaction::commit`] discards every staged write.
pub struct Transaction<'a> {
    id: Uuid,
    store: &'a Store,
    guards: Vec<OwnedMutexGuard<()>>,
    locked_couriers: HashSet<CourierId>,
    holds_order_pool: bool,
    couriers: HashMap<CourierId, Courier>,
    orders: HashMap<OrderId, DeliveryOrder>,
    batches: HashMap<BatchId, Batch>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub(super) fn new(store: &'a Store) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            guards: Vec::new(),
            locked_couriers: HashSet::new(),
            holds_order_pool: false,
            couriers: HashMap::new(),
            orders: HashMap::new(),
            batches: HashMap::new(),
            committed: false,
        }
    }

    /// Takes the row lock of one courier. Re-locking a courier already held
    /// by this transaction is a no-op.
    pub async fn lock_courier(&mut self, id: CourierId) -> Result<(), AppError> {
        self.lock_couriers([id]).await
    }

    /// Takes several courier locks in ascending id order.
    pub async fn lock_couriers<I>(&mut self, ids: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = CourierId>,
    {
        let mut ids: Vec<CourierId> = ids
            .into_iter()
            .filter(|id| !self.locked_couriers.contains(id))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(());
        }
        if self.holds_order_pool {
            return Err(AppError::Internal(
                "courier locks must be taken before the order pool lock".to_string(),
            ));
        }

        for id in ids {
            let guard = self.store.lock_courier(id).await?;
            self.guards.push(guard);
            self.locked_couriers.insert(id);
        }
        Ok(())
    }

    /// Takes the lock that guards claiming orders from the unassigned pool.
    pub async fn lock_order_pool(&mut self) -> Result<(), AppError> {
        if self.holds_order_pool {
            return Ok(());
        }
        let guard = self.store.lock_order_pool().await?;
        self.guards.push(guard);
        self.holds_order_pool = true;
        Ok(())
    }

    pub fn courier(&self, id: CourierId) -> Option<Courier> {
        if let Some(courier) = self.couriers.get(&id) {
            return Some(courier.clone());
        }
        let _gate = self.store.read_gate();
        self.store.couriers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn order(&self, id: OrderId) -> Option<DeliveryOrder> {
        if let Some(order) = self.orders.get(&id) {
            return Some(order.clone());
        }
        let _gate = self.store.read_gate();
        self.store.orders.get(&id).map(|entry| entry.value().clone())
    }

    pub fn batch(&self, id: BatchId) -> Option<Batch> {
        if let Some(batch) = self.batches.get(&id) {
            return Some(batch.clone());
        }
        let _gate = self.store.read_gate();
        self.store.batches.get(&id).map(|entry| entry.value().clone())
    }

    /// Every order, staged or committed, for which `predicate` holds.
    pub fn orders_matching<F>(&self, predicate: F) -> Vec<DeliveryOrder>
    where
        F: Fn(&DeliveryOrder) -> bool,
    {
        let mut matched: Vec<DeliveryOrder> = {
            let _gate = self.store.read_gate();
            self.store
                .orders
                .iter()
                .filter(|entry| !self.orders.contains_key(entry.key()))
                .filter(|entry| predicate(entry.value()))
                .map(|entry| entry.value().clone())
                .collect()
        };

        matched.extend(self.orders.values().filter(|order| predicate(order)).cloned());
        matched
    }

    /// Orders whose batch reference points at `batch_id`, completed ones
    /// included.
    pub fn batch_members(&self, batch_id: BatchId) -> Vec<DeliveryOrder> {
        self.orders_matching(|order| order.batch == Some(batch_id))
    }

    pub fn put_courier(&mut self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    pub fn put_order(&mut self, order: DeliveryOrder) {
        self.orders.insert(order.id, order);
    }

    pub fn put_batch(&mut self, batch: Batch) {
        self.batches.insert(batch.id, batch);
    }

    /// Stages a new batch with a fresh id. Ids of rolled-back batches are not
    /// reused.
    pub fn open_batch(&mut self, courier_id: CourierId, created_at: DateTime<Utc>) -> Batch {
        let batch = Batch {
            id: self.store.allocate_batch_id(),
            courier_id,
            created_at,
            closed_at: None,
        };
        self.put_batch(batch.clone());
        batch
    }

    pub fn has_writes(&self) -> bool {
        !(self.couriers.is_empty() && self.orders.is_empty() && self.batches.is_empty())
    }

    /// Applies every staged write. The locks move into the returned
    /// [`HeldLocks`].
    pub fn commit(mut self) -> HeldLocks {
        {
            let _gate = self.store.write_gate();
            for (id, courier) in self.couriers.drain() {
                self.store.couriers.insert(id, courier);
            }
            for (id, order) in self.orders.drain() {
                self.store.orders.insert(id, order);
            }
            for (id, batch) in self.batches.drain() {
                self.store.batches.insert(id, batch);
            }
        }
        self.committed = true;
        debug!(tx_id = %self.id, locks = self.guards.len(), "transaction committed");

        HeldLocks {
            _guards: std::mem::take(&mut self.guards),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed && self.has_writes() {
            debug!(
                tx_id = %self.id,
                couriers = self.couriers.len(),
                orders = self.orders.len(),
                batches = self.batches.len(),
                "transaction rolled back"
            );
        }
    }
}
