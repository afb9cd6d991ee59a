//! Client-side timer cache.
//!
//! Each entry is a small state machine: an operation issued by the user is
//! applied optimistically and tagged as pending; authoritative pushes either
//! confirm it (status matches the expected one), get ignored as stale, or,
//! once nothing is pending, overwrite the entry. A failed operation rolls the
//! entry back to the snapshot taken before it was issued.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tempo_core::clock::elapsed_secs;
use tempo_core::{TaskId, TimerKind, TimerOperation, TimerSnapshot, TimerStatus};
use tempo_events::ServerMessage;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// Displayed state of one timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerView {
    pub kind: TimerKind,
    pub status: TimerStatus,
    pub remaining_seconds: Option<u64>,
    /// Local instant the current running period is measured from
    pub started_at: Option<DateTime<Utc>>,
    /// Alarm instant
    pub end_instant: Option<DateTime<Utc>>,
    remaining_at_start: Option<u64>,
}

impl TimerView {
    /// View of an authoritative status read taken at `now`.
    #[must_use]
    pub fn from_snapshot(snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Self {
        let mut view = Self {
            kind: snapshot.kind,
            status: snapshot.status,
            remaining_seconds: snapshot.remaining_seconds,
            started_at: None,
            end_instant: snapshot.end_instant,
            remaining_at_start: None,
        };
        view.settle(snapshot.status, now);
        view
    }

    /// Enter `status`, anchoring the running period at `now` when running.
    fn settle(&mut self, status: TimerStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == TimerStatus::Running {
            if self.kind == TimerKind::Alarm {
                self.remaining_seconds = self.alarm_remaining(now).or(self.remaining_seconds);
            }
            self.started_at = Some(now);
            self.remaining_at_start = self.remaining_seconds;
        } else {
            self.started_at = None;
            self.remaining_at_start = None;
        }
    }

    fn alarm_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        self.end_instant.map(|end| elapsed_secs(now, end))
    }

    /// Recompute the displayed remaining time. Never changes status.
    fn tick(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Running {
            return;
        }
        match self.kind {
            TimerKind::Countdown => {
                if let (Some(started_at), Some(base)) = (self.started_at, self.remaining_at_start)
                {
                    self.remaining_seconds =
                        Some(base.saturating_sub(elapsed_secs(started_at, now)));
                }
            }
            TimerKind::Alarm => {
                if let Some(remaining) = self.alarm_remaining(now) {
                    self.remaining_seconds = Some(remaining);
                }
            }
        }
    }

    /// Optimistic result of `operation` issued at `now`.
    fn optimistic(&self, operation: TimerOperation, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.tick(now);
        next.settle(operation.target_status(), now);
        next
    }
}

/// An operation issued but not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub operation: TimerOperation,
    pub expected_status: TimerStatus,
    /// View before the operation was applied
    pub snapshot: TimerView,
}

/// One cached timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    view: TimerView,
    pending: Option<PendingOperation>,
    /// Last authoritative state installed into `view`
    last_applied: Option<TimerUpdate>,
}

impl CacheEntry {
    pub const fn view(&self) -> &TimerView {
        &self.view
    }

    pub const fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub const fn last_applied(&self) -> Option<&TimerUpdate> {
        self.last_applied.as_ref()
    }
}

/// Authoritative timer state pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerUpdate {
    pub task_id: TaskId,
    pub status: TimerStatus,
    pub remaining_seconds: Option<u64>,
    pub completed: bool,
}

impl TimerUpdate {
    /// Authoritative state carried by a status read.
    #[must_use]
    pub const fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        Self {
            task_id: snapshot.task_id,
            status: snapshot.status,
            remaining_seconds: snapshot.remaining_seconds,
            completed: snapshot.completed,
        }
    }
}

/// What an authoritative update did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Applied; `alert` is set when it moved the entry into Completed
    Applied { alert: bool },
    /// Stale relative to a pending operation
    Ignored,
    /// No entry for the task
    UnknownTask,
}

/// Request for a fresh authoritative read of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    pub task_id: TaskId,
}

/// Side effect the caller should carry out after a push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEffect {
    /// Play the completion alert
    Alert { task_id: TaskId },
    /// Show a completion message
    Notify {
        task_id: TaskId,
        title: String,
        message: String,
    },
    /// Fetch the task's status
    Refresh(RefreshRequest),
}

/// Client mirror of the user's timers keyed by task id.
#[derive(Debug, Clone, Default)]
pub struct ClientTimerCache {
    entries: HashMap<TaskId, CacheEntry>,
}

impl ClientTimerCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install authoritative state from a status read, dropping anything
    /// pending for the task.
    pub fn seed(&mut self, snapshot: &TimerSnapshot, now: DateTime<Utc>) {
        self.entries.insert(
            snapshot.task_id,
            CacheEntry {
                view: TimerView::from_snapshot(snapshot, now),
                pending: None,
                last_applied: Some(TimerUpdate::from_snapshot(snapshot)),
            },
        );
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&CacheEntry> {
        self.entries.get(task_id)
    }

    pub fn remove(&mut self, task_id: &TaskId) -> Option<CacheEntry> {
        self.entries.remove(task_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `operation` optimistically and mark it pending.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTask` for an uncached task and `OperationPending` when
    /// an earlier operation has not been confirmed or failed yet.
    pub fn begin(
        &mut self,
        task_id: TaskId,
        operation: TimerOperation,
        now: DateTime<Utc>,
    ) -> Result<&TimerView> {
        let entry = self
            .entries
            .get_mut(&task_id)
            .ok_or(CacheError::UnknownTask { task_id })?;

        if let Some(pending) = &entry.pending {
            return Err(CacheError::OperationPending {
                task_id,
                operation: pending.operation,
            });
        }

        let next = entry.view.optimistic(operation, now);
        entry.pending = Some(PendingOperation {
            operation,
            expected_status: next.status,
            snapshot: std::mem::replace(&mut entry.view, next),
        });

        debug!(task_id = %task_id, operation = %operation, "Optimistic timer operation");
        Ok(&entry.view)
    }

    /// Reconcile an authoritative update.
    ///
    /// Applying the same update twice leaves the cache as applying it once,
    /// however late the repeat arrives: with nothing pending, an update equal
    /// to the last one installed keeps the current running anchor.
    pub fn apply_update(&mut self, update: &TimerUpdate, now: DateTime<Utc>) -> UpdateOutcome {
        let Some(entry) = self.entries.get_mut(&update.task_id) else {
            return UpdateOutcome::UnknownTask;
        };

        if entry.pending.is_none() && entry.last_applied.as_ref() == Some(update) {
            debug!(task_id = %update.task_id, "Duplicate update");
            return UpdateOutcome::Applied { alert: false };
        }

        if let Some(pending) = &entry.pending {
            if pending.expected_status != update.status {
                debug!(
                    task_id = %update.task_id,
                    expected = %pending.expected_status,
                    received = %update.status,
                    "Ignoring stale update"
                );
                return UpdateOutcome::Ignored;
            }
        }

        let was_completed = entry.view.status == TimerStatus::Completed;
        entry.view.remaining_seconds = update.remaining_seconds;
        entry.view.settle(update.status, now);
        entry.pending = None;
        entry.last_applied = Some(*update);

        UpdateOutcome::Applied {
            alert: update.completed && update.status == TimerStatus::Completed && !was_completed,
        }
    }

    /// Roll back a failed operation and ask for a fresh read.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTask` for an uncached task and `NotPending` when no
    /// operation is outstanding.
    pub fn fail(&mut self, task_id: TaskId) -> Result<RefreshRequest> {
        let entry = self
            .entries
            .get_mut(&task_id)
            .ok_or(CacheError::UnknownTask { task_id })?;
        let pending = entry
            .pending
            .take()
            .ok_or(CacheError::NotPending { task_id })?;

        debug!(task_id = %task_id, operation = %pending.operation, "Rolled back failed operation");
        entry.view = pending.snapshot;
        Ok(RefreshRequest { task_id })
    }

    /// Display-only tick of every running timer.
    pub fn local_tick(&mut self, now: DateTime<Utc>) {
        for entry in self.entries.values_mut() {
            entry.view.tick(now);
        }
    }

    /// Route a push frame into the cache.
    pub fn apply_message(
        &mut self,
        message: &ServerMessage,
        now: DateTime<Utc>,
    ) -> Option<ClientEffect> {
        match message {
            ServerMessage::TimerUpdate {
                task_id,
                status,
                remaining_seconds,
                completed,
            } => {
                let update = TimerUpdate {
                    task_id: *task_id,
                    status: *status,
                    remaining_seconds: *remaining_seconds,
                    completed: *completed,
                };
                match self.apply_update(&update, now) {
                    UpdateOutcome::Applied { alert: true } => {
                        Some(ClientEffect::Alert { task_id: *task_id })
                    }
                    UpdateOutcome::UnknownTask => {
                        Some(ClientEffect::Refresh(RefreshRequest { task_id: *task_id }))
                    }
                    UpdateOutcome::Applied { alert: false } | UpdateOutcome::Ignored => None,
                }
            }
            ServerMessage::Notification {
                title,
                message,
                task_id,
            } => Some(ClientEffect::Notify {
                task_id: *task_id,
                title: title.clone(),
                message: message.clone(),
            }),
            ServerMessage::Error { message } => {
                warn!(message = %message, "Server rejected a frame");
                None
            }
            ServerMessage::Subscribed { .. }
            | ServerMessage::Unsubscribed { .. }
            | ServerMessage::Pong => None,
        }
    }
}
