//! SurrealDB-backed timer store.
//!
//! Records live in the `task_timer` table keyed by task id, so an upsert by
//! primary key replaces the whole row in one statement.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::{RecordId, Surreal};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::TimerStore;
use crate::types::{OwnerId, TaskId, TaskTimerRecord, TimerKind, TimerStatus};

const TABLE: &str = "task_timer";

/// Configuration for the SurrealDB store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URL (e.g., "mem://", "rocksdb://data/tempo.db", "ws://localhost:8000").
    ///
    /// Only a persistent engine keeps live timers across restarts.
    pub url: String,
    /// Namespace to use
    pub namespace: String,
    /// Database to use
    pub database: String,
    /// Optional root credentials
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

/// Root credentials for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl StoreConfig {
    /// Create an in-memory configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "tempo".to_string(),
            database: "timers".to_string(),
            credentials: None,
        }
    }

    /// Create a configuration for an embedded RocksDB store at `path`.
    #[must_use]
    pub fn on_disk(path: impl AsRef<Path>) -> Self {
        Self::in_memory().with_url(format!("rocksdb://{}", path.as_ref().display()))
    }

    /// Set the connection URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set credentials for authentication.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Row shape in the `task_timer` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimerRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    task_id: String,
    owner_id: String,
    title: String,
    timer_kind: TimerKind,
    timer_status: TimerStatus,
    countdown_duration_seconds: Option<u64>,
    remaining_seconds: Option<u64>,
    alarm_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    is_completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&TaskTimerRecord> for TimerRow {
    fn from(record: &TaskTimerRecord) -> Self {
        Self {
            id: None,
            task_id: record.id.to_string(),
            owner_id: record.owner_id.as_str().to_string(),
            title: record.title.clone(),
            timer_kind: record.timer_kind,
            timer_status: record.timer_status,
            countdown_duration_seconds: record.countdown_duration_seconds,
            remaining_seconds: record.remaining_seconds,
            alarm_at: record.alarm_at,
            started_at: record.started_at,
            paused_at: record.paused_at,
            is_completed: record.is_completed,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl TryFrom<TimerRow> for TaskTimerRecord {
    type Error = Error;

    fn try_from(row: TimerRow) -> Result<Self> {
        let id = row
            .task_id
            .parse::<TaskId>()
            .map_err(|_| Error::storage(format!("corrupt task id '{}'", row.task_id)))?;

        Ok(Self {
            id,
            owner_id: OwnerId::new(row.owner_id),
            title: row.title,
            timer_kind: row.timer_kind,
            timer_status: row.timer_status,
            countdown_duration_seconds: row.countdown_duration_seconds,
            remaining_seconds: row.remaining_seconds,
            alarm_at: row.alarm_at,
            started_at: row.started_at,
            paused_at: row.paused_at,
            is_completed: row.is_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn from_surrealdb_error(err: surrealdb::Error) -> Error {
    Error::storage(err.to_string())
}

fn into_records(rows: Vec<TimerRow>) -> Result<Vec<TaskTimerRecord>> {
    rows.into_iter().map(TaskTimerRecord::try_from).collect()
}

/// Timer store backed by SurrealDB.
#[derive(Debug, Clone)]
pub struct SurrealTimerStore {
    db: Arc<Surreal<Any>>,
    config: StoreConfig,
}

impl SurrealTimerStore {
    /// Connect to the database with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or authentication fails.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting timer store"
        );

        let db = Surreal::<Any>::init();
        db.connect(config.url.as_str())
            .await
            .map_err(from_surrealdb_error)?;

        if let Some(creds) = &config.credentials {
            db.signin(Root {
                username: &creds.username,
                password: &creds.password,
            })
            .await
            .map_err(from_surrealdb_error)?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(from_surrealdb_error)?;

        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    /// Get the store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Check if the database is healthy.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check query fails.
    pub async fn health_check(&self) -> Result<()> {
        self.db
            .query("RETURN true")
            .await
            .map_err(from_surrealdb_error)?;
        Ok(())
    }
}

#[async_trait]
impl TimerStore for SurrealTimerStore {
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskTimerRecord>> {
        let row: Option<TimerRow> = self
            .db
            .select((TABLE, task_id.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        row.map(TaskTimerRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &TaskTimerRecord) -> Result<()> {
        let row = TimerRow::from(record);
        let saved: Option<TimerRow> = self
            .db
            .upsert((TABLE, record.id.to_string()))
            .content(row)
            .await
            .map_err(from_surrealdb_error)?;

        debug!(task_id = %record.id, status = %record.timer_status, "Persisted timer record");
        saved
            .map(|_| ())
            .ok_or_else(|| Error::storage(format!("failed to save task '{}'", record.id)))
    }

    async fn delete(&self, task_id: &TaskId) -> Result<bool> {
        let removed: Option<TimerRow> = self
            .db
            .delete((TABLE, task_id.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(removed.is_some())
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<TaskTimerRecord>> {
        let rows: Vec<TimerRow> = self
            .db
            .query("SELECT * FROM type::table($table) WHERE owner_id = $owner ORDER BY created_at")
            .bind(("table", TABLE))
            .bind(("owner", owner.as_str().to_string()))
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        into_records(rows)
    }

    async fn list_live(&self) -> Result<Vec<TaskTimerRecord>> {
        let rows: Vec<TimerRow> = self
            .db
            .query(
                "SELECT * FROM type::table($table) \
                 WHERE timer_status = 'running' OR timer_status = 'paused'",
            )
            .bind(("table", TABLE))
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        into_records(rows)
    }
}
