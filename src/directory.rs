use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::message::MemberRecord;
use crate::store::{EntityStore, StoreError};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("member already exists")]
    Conflict,
    #[error("member not found")]
    NotFound,
    #[error("store failure: {0}")]
    Store(String),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => DirectoryError::Conflict,
            StoreError::NotFound => DirectoryError::NotFound,
            StoreError::Unavailable(msg) => DirectoryError::Store(msg),
        }
    }
}

/// Authoritative mapping from `(group, user)` to membership state.
///
/// Validates key well-formedness only; business rules live in the
/// dispatcher. Store-level failures propagate as distinct error kinds and
/// are never swallowed.
pub struct Directory {
    store: Arc<dyn EntityStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    fn require(value: &str, what: &str) -> Result<(), DirectoryError> {
        if value.trim().is_empty() {
            return Err(DirectoryError::InvalidArgument(format!(
                "{what} is required"
            )));
        }
        Ok(())
    }

    /// Persist a new membership record, stamping `last_modified`.
    /// Duplicates surface as [`DirectoryError::Conflict`] via the store's
    /// insert-if-absent signal, not a prior read.
    pub async fn add(&self, mut record: MemberRecord) -> Result<(), DirectoryError> {
        Self::require(&record.group, "group")?;
        Self::require(&record.user_id, "user id")?;
        record.last_modified = Utc::now();
        self.store.insert(record).await?;
        Ok(())
    }

    pub async fn remove(&self, group: &str, user: &str) -> Result<(), DirectoryError> {
        Self::require(group, "group")?;
        Self::require(user, "user id")?;
        self.store.delete(group, user).await?;
        Ok(())
    }

    /// Absence is an expected outcome for presence checks, so it is
    /// reported as `None` rather than an error.
    pub async fn get_one(
        &self,
        group: &str,
        user: &str,
    ) -> Result<Option<MemberRecord>, DirectoryError> {
        Self::require(group, "group")?;
        Self::require(user, "user id")?;
        Ok(self.store.get(group, user).await?)
    }

    /// Map of `user_id` to record for every member of `group`. Empty map
    /// when the group has no members; callers must treat that distinctly
    /// from "group not found", since groups exist only through members.
    pub async fn members_of(
        &self,
        group: &str,
    ) -> Result<HashMap<String, MemberRecord>, DirectoryError> {
        Self::require(group, "group")?;
        let records = self.store.query_partition(group).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.user_id.clone(), record))
            .collect())
    }

    /// True iff at least one record in any group carries `user`. A live
    /// connection id is not required; presence affirms directory
    /// membership, not socket state.
    pub async fn is_online(&self, user: &str) -> Result<bool, DirectoryError> {
        Self::require(user, "user id")?;
        let records = self.store.scan().await?;
        Ok(records.iter().any(|record| record.user_id == user))
    }

    /// Remove every membership record carrying `user`, across all groups.
    /// Succeeds as a no-op when none exist.
    pub async fn delete_all_for_user(&self, user: &str) -> Result<(), DirectoryError> {
        Self::require(user, "user id")?;
        let mut removed = 0usize;
        for record in self.store.scan().await? {
            if record.user_id != user {
                continue;
            }
            match self.store.delete(&record.group, &record.user_id).await {
                // a concurrent remove already won the race for this key
                Ok(()) | Err(StoreError::NotFound) => removed += 1,
                Err(err) => return Err(err.into()),
            }
        }
        debug!(user, removed, "membership sweep finished");
        Ok(())
    }

    /// Every record across all groups; administrative presence listing.
    pub async fn list_all(&self) -> Result<Vec<MemberRecord>, DirectoryError> {
        Ok(self.store.scan().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directory() -> Directory {
        Directory::new(Arc::new(MemoryStore::new()))
    }

    fn record(group: &str, user: &str, language: &str) -> MemberRecord {
        MemberRecord::new(group, user, language, "")
    }

    #[tokio::test]
    async fn add_rejects_blank_keys() {
        let dir = directory();
        for (group, user) in [("", "alice"), ("room1", ""), ("  ", "alice"), ("room1", "\t")] {
            let err = dir.add(record(group, user, "en")).await.unwrap_err();
            assert!(matches!(err, DirectoryError::InvalidArgument(_)), "{group:?}/{user:?}");
        }
    }

    #[tokio::test]
    async fn add_twice_conflicts() {
        let dir = directory();
        dir.add(record("room1", "alice", "en")).await.unwrap();
        let err = dir.add(record("room1", "alice", "fr")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict));
    }

    #[tokio::test]
    async fn add_stamps_last_modified() {
        let dir = directory();
        let mut stale = record("room1", "alice", "en");
        stale.last_modified = chrono::DateTime::<Utc>::UNIX_EPOCH;
        let before = Utc::now();
        dir.add(stale).await.unwrap();
        let stored = dir.get_one("room1", "alice").await.unwrap().unwrap();
        assert!(stored.last_modified >= before);
    }

    #[tokio::test]
    async fn remove_missing_member_is_not_found() {
        let dir = directory();
        let err = dir.remove("room1", "ghost").await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound));
    }

    #[tokio::test]
    async fn remove_then_lookup_is_absent() {
        let dir = directory();
        dir.add(record("room1", "alice", "en")).await.unwrap();
        dir.remove("room1", "alice").await.unwrap();
        assert!(dir.get_one("room1", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn members_of_empty_group_is_an_empty_map() {
        let dir = directory();
        assert!(dir.members_of("empty-room").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn members_of_maps_user_id_to_record() {
        let dir = directory();
        dir.add(record("room1", "alice", "en")).await.unwrap();
        dir.add(record("room1", "bob", "es")).await.unwrap();
        dir.add(record("room2", "carol", "de")).await.unwrap();
        let members = dir.members_of("room1").await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members["alice"].language, "en");
        assert_eq!(members["bob"].language, "es");
    }

    #[tokio::test]
    async fn is_online_does_not_require_a_connection_id() {
        let dir = directory();
        dir.add(record("room1", "alice", "en")).await.unwrap();
        assert!(dir.is_online("alice").await.unwrap());
        assert!(!dir.is_online("bob").await.unwrap());
    }

    #[tokio::test]
    async fn is_online_rejects_blank_user() {
        let dir = directory();
        let err = dir.is_online("  ").await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn delete_all_for_user_sweeps_every_group_and_no_others() {
        let dir = directory();
        dir.add(record("room1", "alice", "en")).await.unwrap();
        dir.add(record("room2", "alice", "en")).await.unwrap();
        dir.add(record("room1", "bob", "es")).await.unwrap();
        dir.delete_all_for_user("alice").await.unwrap();
        assert!(!dir.is_online("alice").await.unwrap());
        assert!(dir.is_online("bob").await.unwrap());
    }

    #[tokio::test]
    async fn delete_all_for_unknown_user_is_a_no_op() {
        let dir = directory();
        dir.delete_all_for_user("nobody").await.unwrap();
    }

    #[tokio::test]
    async fn list_all_spans_groups() {
        let dir = directory();
        dir.add(record("room1", "alice", "en")).await.unwrap();
        dir.add(record("room2", "bob", "es")).await.unwrap();
        assert_eq!(dir.list_all().await.unwrap().len(), 2);
    }
}
