use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

use crate::message::MemberRecord;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("entity already exists")]
    Conflict,
    #[error("entity not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Narrow seam over the external key-partitioned entity store.
///
/// `insert` must reject a duplicate `(group, user)` pair with
/// [`StoreError::Conflict`] using the store's own insert-if-absent
/// semantics. The directory depends on that signal instead of a
/// read-then-write check.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn insert(&self, record: MemberRecord) -> Result<(), StoreError>;
    async fn get(&self, group: &str, user: &str) -> Result<Option<MemberRecord>, StoreError>;
    async fn delete(&self, group: &str, user: &str) -> Result<(), StoreError>;
    /// Every record in one partition. Empty for an unknown group; there is
    /// no separate group-existence concept.
    async fn query_partition(&self, group: &str) -> Result<Vec<MemberRecord>, StoreError>;
    /// Every record across all partitions. Paging a large remote result
    /// set is the implementation's concern.
    async fn scan(&self) -> Result<Vec<MemberRecord>, StoreError>;
}

/// In-process store keyed the way the managed table service keys entities:
/// partition (group) + row (user). The map's entry API supplies the
/// insert-if-absent conflict signal atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: DashMap<(String, String), MemberRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert(&self, record: MemberRecord) -> Result<(), StoreError> {
        let key = (record.group.clone(), record.user_id.clone());
        match self.rows.entry(key) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, group: &str, user: &str) -> Result<Option<MemberRecord>, StoreError> {
        let key = (group.to_string(), user.to_string());
        Ok(self.rows.get(&key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, group: &str, user: &str) -> Result<(), StoreError> {
        let key = (group.to_string(), user.to_string());
        match self.rows.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn query_partition(&self, group: &str) -> Result<Vec<MemberRecord>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|entry| entry.key().0 == group)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn scan(&self) -> Result<Vec<MemberRecord>, StoreError> {
        Ok(self.rows.iter().map(|entry| entry.value().clone()).collect())
    }
}
