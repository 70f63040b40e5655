use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::ports::{OrderMutator, OrderRegistry};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing order snapshots.
pub const CF_ORDERS: &str = "orders";

/// A persistent order registry backed by RocksDB.
///
/// Orders are stored as JSON under their id in the `orders` column family.
/// Writes to one id go through a per-id lock so the read-check-write of a
/// compare-and-swap is atomic; different ids never contend.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBOrderRegistry {
    db: Arc<DB>,
    locks: Arc<Mutex<HashMap<OrderId, Arc<Mutex<()>>>>>,
}

impl RocksDBOrderRegistry {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders])?;

        Ok(Self {
            db: Arc::new(db),
            locks: Arc::default(),
        })
    }

    fn orders_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_ORDERS).ok_or_else(|| {
            OrderError::InternalError(Box::new(std::io::Error::other(
                "Orders column family not found",
            )))
        })
    }

    /// Runs `op` while holding the lock for `id`. The lock entry is dropped
    /// from the map once no other caller holds or waits on it.
    async fn with_lock<T>(&self, id: &OrderId, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id.clone()).or_default().clone()
        };
        let result = {
            let _guard = lock.lock().await;
            op()
        };

        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(id);
        }
        result
    }

    fn read(&self, id: &OrderId) -> Result<Option<Order>> {
        let cf = self.orders_cf()?;
        match self.db.get_pinned_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, order: &Order) -> Result<()> {
        let cf = self.orders_cf()?;
        let value = serde_json::to_vec(order)?;
        self.db.put_cf(cf, order.id.as_str().as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl OrderRegistry for RocksDBOrderRegistry {
    async fn create(&self, order: Order) -> Result<OrderId> {
        let id = order.id.clone();
        self.with_lock(&id, || {
            if self.read(&order.id)?.is_some() {
                return Err(OrderError::DuplicateId(order.id));
            }
            self.write(&order)?;
            Ok(order.id)
        })
        .await
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        self.read(id)?
            .ok_or_else(|| OrderError::NotFound(id.clone()))
    }

    async fn compare_and_swap(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        mutator: OrderMutator,
    ) -> Result<Order> {
        self.with_lock(id, || {
            let mut order = self
                .read(id)?
                .ok_or_else(|| OrderError::NotFound(id.clone()))?;
            if order.status != expected {
                return Err(OrderError::Conflict {
                    id: id.clone(),
                    expected,
                    actual: order.status,
                });
            }
            mutator(&mut order)?;
            self.write(&order)?;
            Ok(order)
        })
        .await
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let cf = self.orders_cf()?;
        let mut orders = Vec::new();
        // Keys are the UTF-8 ids, so iteration order already matches `OrderId` ordering.
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            orders.push(serde_json::from_slice(&value)?);
        }
        Ok(orders)
    }
}
