//! Persistent store abstraction for task timer records.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{OwnerId, TaskId, TaskTimerRecord};

/// Durable storage for task timer records.
///
/// Implementations must make `upsert` atomic per record: a reader sees either
/// the previous record or the new one, never a mix.
#[async_trait]
pub trait TimerStore: Send + Sync {
    /// Point lookup by task id.
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskTimerRecord>>;

    /// Insert or replace a record by its primary key.
    async fn upsert(&self, record: &TaskTimerRecord) -> Result<()>;

    /// Delete a record. Returns whether it existed.
    async fn delete(&self, task_id: &TaskId) -> Result<bool>;

    /// All records owned by `owner`, oldest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<TaskTimerRecord>>;

    /// All records whose timer is Running or Paused.
    async fn list_live(&self) -> Result<Vec<TaskTimerRecord>>;
}

/// In-memory timer store.
#[derive(Debug, Default)]
pub struct InMemoryTimerStore {
    records: RwLock<HashMap<TaskId, TaskTimerRecord>>,
}

impl InMemoryTimerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TimerStore for InMemoryTimerStore {
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskTimerRecord>> {
        Ok(self.records.read().await.get(task_id).cloned())
    }

    async fn upsert(&self, record: &TaskTimerRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn delete(&self, task_id: &TaskId) -> Result<bool> {
        Ok(self.records.write().await.remove(task_id).is_some())
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<TaskTimerRecord>> {
        let records = self.records.read().await;
        let mut owned: Vec<TaskTimerRecord> = records
            .values()
            .filter(|record| record.is_owned_by(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn list_live(&self) -> Result<Vec<TaskTimerRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| record.timer_status.is_live())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{TimerSpec, TimerStatus};

    fn record(owner: &str) -> TaskTimerRecord {
        TaskTimerRecord::new(
            OwnerId::new(owner),
            "Laundry",
            TimerSpec::Countdown {
                duration_seconds: 60,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get() -> Result<()> {
        let store = InMemoryTimerStore::new();
        let task = record("alice");
        store.upsert(&task).await?;

        assert_eq!(store.get(&task.id).await?, Some(task));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() -> Result<()> {
        let store = InMemoryTimerStore::new();
        let mut task = record("alice");
        store.upsert(&task).await?;

        task.timer_status = TimerStatus::Running;
        task.started_at = Some(Utc::now());
        store.upsert(&task).await?;

        let stored = store.get(&task.id).await?;
        assert_eq!(stored.map(|r| r.timer_status), Some(TimerStatus::Running));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_by_owner_is_scoped() -> Result<()> {
        let store = InMemoryTimerStore::new();
        store.upsert(&record("alice")).await?;
        store.upsert(&record("alice")).await?;
        store.upsert(&record("bob")).await?;

        assert_eq!(store.list_by_owner(&OwnerId::new("alice")).await?.len(), 2);
        assert_eq!(store.list_by_owner(&OwnerId::new("bob")).await?.len(), 1);
        assert!(store.list_by_owner(&OwnerId::new("carol")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_live_filters_by_status() -> Result<()> {
        let store = InMemoryTimerStore::new();
        let idle = record("alice");
        let mut running = record("alice");
        running.timer_status = TimerStatus::Running;
        let mut paused = record("bob");
        paused.timer_status = TimerStatus::Paused;
        let mut done = record("bob");
        done.timer_status = TimerStatus::Completed;

        for task in [&idle, &running, &paused, &done] {
            store.upsert(task).await?;
        }

        let mut live: Vec<TaskId> = store.list_live().await?.iter().map(|r| r.id).collect();
        live.sort();
        let mut expected = vec![running.id, paused.id];
        expected.sort();
        assert_eq!(live, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete() -> Result<()> {
        let store = InMemoryTimerStore::new();
        let task = record("alice");
        store.upsert(&task).await?;

        assert!(store.delete(&task.id).await?);
        assert!(!store.delete(&task.id).await?);
        assert!(store.is_empty().await);
        Ok(())
    }
}
