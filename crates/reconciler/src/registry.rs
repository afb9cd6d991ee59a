//! Process-local registry of live timers.
//!
//! The registry mirrors every Running or Paused record in the store and is
//! rebuilt from it at process start. All access goes through
//! [`ActiveTimerRegistry::lock`]; callers hold the guard across their whole
//! read-validate-persist-update sequence so a tick and a user operation on the
//! same timer never interleave.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tempo_core::clock::elapsed_secs;
use tempo_core::{OwnerId, TaskId, TaskTimerRecord, TimerKind, TimerStatus};
use tokio::sync::{Mutex, MutexGuard};

/// When a live timer is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Seconds left as of the entry's `started_at`, or as of pausing.
    Countdown { remaining_seconds: u64 },
    /// Fixed instant the alarm fires.
    Alarm { end_instant: DateTime<Utc> },
}

/// Outcome of looking at an entry at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Not counting; nothing to do.
    Paused,
    /// Countdown still running with this many seconds left.
    Remaining(u64),
    /// Alarm not yet due.
    Pending,
    /// Reached zero or the alarm instant.
    Completed,
}

/// Ephemeral view of one live timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTimerEntry {
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Deadline,
    pub paused_at: Option<DateTime<Utc>>,
}

impl ActiveTimerEntry {
    /// Build an entry for a Running or Paused record.
    ///
    /// Returns `None` for records that are not live or lack the field their
    /// kind needs.
    #[must_use]
    pub fn from_record(record: &TaskTimerRecord) -> Option<Self> {
        if !record.timer_status.is_live() {
            return None;
        }

        let deadline = match record.timer_kind {
            TimerKind::Countdown => Deadline::Countdown {
                remaining_seconds: record.remaining_seconds?,
            },
            TimerKind::Alarm => Deadline::Alarm {
                end_instant: record.alarm_at?,
            },
        };

        Some(Self {
            task_id: record.id,
            owner_id: record.owner_id.clone(),
            started_at: record.started_at,
            deadline,
            paused_at: match record.timer_status {
                TimerStatus::Paused => record.paused_at,
                _ => None,
            },
        })
    }

    /// Timer kind of the entry.
    #[must_use]
    pub const fn kind(&self) -> TimerKind {
        match self.deadline {
            Deadline::Countdown { .. } => TimerKind::Countdown,
            Deadline::Alarm { .. } => TimerKind::Alarm,
        }
    }

    /// Check if the entry is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Where the timer stands at `now`.
    #[must_use]
    pub fn advance(&self, now: DateTime<Utc>) -> Advance {
        if self.is_paused() {
            return Advance::Paused;
        }

        match self.deadline {
            Deadline::Countdown { remaining_seconds } => {
                let elapsed = self.started_at.map_or(0, |started| elapsed_secs(started, now));
                match remaining_seconds.saturating_sub(elapsed) {
                    0 => Advance::Completed,
                    left => Advance::Remaining(left),
                }
            }
            Deadline::Alarm { end_instant } if now >= end_instant => Advance::Completed,
            Deadline::Alarm { .. } => Advance::Pending,
        }
    }
}

/// Concurrency-safe map of live timers keyed by task id.
#[derive(Debug, Default)]
pub struct ActiveTimerRegistry {
    entries: Mutex<HashMap<TaskId, ActiveTimerEntry>>,
}

impl ActiveTimerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive access.
    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            entries: self.entries.lock().await,
        }
    }
}

/// Exclusive handle on the registry contents.
#[derive(Debug)]
pub struct RegistryGuard<'a> {
    entries: MutexGuard<'a, HashMap<TaskId, ActiveTimerEntry>>,
}

impl RegistryGuard<'_> {
    /// Look up an entry.
    #[must_use]
    pub fn get(&self, task_id: &TaskId) -> Option<&ActiveTimerEntry> {
        self.entries.get(task_id)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, entry: ActiveTimerEntry) {
        self.entries.insert(entry.task_id, entry);
    }

    /// Remove an entry, returning it if present.
    pub fn remove(&mut self, task_id: &TaskId) -> Option<ActiveTimerEntry> {
        self.entries.remove(task_id)
    }

    /// Track `record` if it is live, forget it otherwise.
    pub fn sync(&mut self, record: &TaskTimerRecord) {
        match ActiveTimerEntry::from_record(record) {
            Some(entry) => self.insert(entry),
            None => {
                self.remove(&record.id);
            }
        }
    }

    /// Copy of all entries, ordered by task id.
    #[must_use]
    pub fn entries(&self) -> Vec<ActiveTimerEntry> {
        let mut entries: Vec<ActiveTimerEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|entry| entry.task_id);
        entries
    }

    /// Number of tracked timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
