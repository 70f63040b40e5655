use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::ports::{OrderMutator, OrderRegistry};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type Slot = Arc<Mutex<Order>>;

/// A thread-safe in-memory order registry.
///
/// The outer `RwLock` only guards the id → slot index and is write-locked
/// solely to insert new orders. Each order sits behind its own `Mutex`, so a
/// compare-and-swap serializes writers of one order while reads and writes
/// of other orders proceed in parallel.
#[derive(Default, Clone)]
pub struct InMemoryOrderRegistry {
    orders: Arc<RwLock<HashMap<OrderId, Slot>>>,
}

impl InMemoryOrderRegistry {
    /// Creates a new, empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: &OrderId) -> Result<Slot> {
        let orders = self.orders.read().await;
        orders
            .get(id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(id.clone()))
    }
}

#[async_trait]
impl OrderRegistry for InMemoryOrderRegistry {
    async fn create(&self, order: Order) -> Result<OrderId> {
        let mut orders = self.orders.write().await;
        match orders.entry(order.id.clone()) {
            Entry::Occupied(_) => Err(OrderError::DuplicateId(order.id)),
            Entry::Vacant(slot) => {
                let id = order.id.clone();
                slot.insert(Arc::new(Mutex::new(order)));
                Ok(id)
            }
        }
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        let slot = self.slot(id).await?;
        let order = slot.lock().await;
        Ok(order.clone())
    }

    async fn compare_and_swap(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        mutator: OrderMutator,
    ) -> Result<Order> {
        let slot = self.slot(id).await?;
        let mut stored = slot.lock().await;
        if stored.status != expected {
            return Err(OrderError::Conflict {
                id: id.clone(),
                expected,
                actual: stored.status,
            });
        }

        // Mutate a copy so a failing mutator leaves the stored order untouched.
        let mut next = stored.clone();
        mutator(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let slots: Vec<Slot> = {
            let orders = self.orders.read().await;
            orders.values().cloned().collect()
        };
        let mut all = Vec::with_capacity(slots.len());
        for slot in slots {
            all.push(slot.lock().await.clone());
        }
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}
