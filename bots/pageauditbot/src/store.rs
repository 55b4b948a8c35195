// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bounded in-memory keyed store for completed records

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct Inner<T> {
    records: HashMap<Uuid, Arc<T>>,
    /// Insertion order, oldest first
    order: VecDeque<Uuid>,
}

/// Records are immutable once stored; readers get shared snapshots.
/// When full, the oldest record is evicted.
pub struct RecordStore<T> {
    inner: RwLock<Inner<T>>,
    capacity: usize,
}

impl<T> RecordStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Store `record` under `id`, replacing any previous record with that id
    pub async fn insert(&self, id: Uuid, record: T) -> Arc<T> {
        let record = Arc::new(record);
        let mut inner = self.inner.write().await;

        if inner.records.insert(id, Arc::clone(&record)).is_some() {
            inner.order.retain(|existing| *existing != id);
        }
        inner.order.push_back(id);

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.records.remove(&oldest);
                tracing::debug!("Evicted record {} (capacity {})", oldest, self.capacity);
            }
        }

        record
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<T>> {
        self.inner.read().await.records.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
