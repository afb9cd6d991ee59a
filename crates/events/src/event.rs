//! Timer events published by the timer service and the reconciliation loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempo_core::{machine, OwnerId, TaskId, TaskTimerRecord, TimerKind, TimerStatus};

/// State patch for one timer.
///
/// Carries no identity beyond its fields; consumers must tolerate duplicates
/// and apply it idempotently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerUpdateEvent {
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub status: TimerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    pub completed: bool,
}

impl TimerUpdateEvent {
    /// Build an update describing `record` as seen at `now`.
    #[must_use]
    pub fn from_record(record: &TaskTimerRecord, now: DateTime<Utc>) -> Self {
        Self {
            task_id: record.id,
            owner_id: record.owner_id.clone(),
            status: record.timer_status,
            remaining_seconds: machine::live_remaining(record, now),
            completed: record.is_completed,
        }
    }

    /// Routine tick update for a running timer.
    #[must_use]
    pub const fn running(
        task_id: TaskId,
        owner_id: OwnerId,
        remaining_seconds: Option<u64>,
    ) -> Self {
        Self {
            task_id,
            owner_id,
            status: TimerStatus::Running,
            remaining_seconds,
            completed: false,
        }
    }
}

/// Item carried by the internal event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Routine state change or tick.
    Update(TimerUpdateEvent),
    /// A timer reached zero or its alarm instant.
    Completed {
        update: TimerUpdateEvent,
        title: String,
        kind: TimerKind,
    },
}

impl TimerEvent {
    /// Natural completion of `record`, which must already be persisted as
    /// Completed.
    #[must_use]
    pub fn completed(record: &TaskTimerRecord) -> Self {
        Self::Completed {
            update: TimerUpdateEvent {
                task_id: record.id,
                owner_id: record.owner_id.clone(),
                status: TimerStatus::Completed,
                remaining_seconds: match record.timer_kind {
                    TimerKind::Countdown => Some(0),
                    TimerKind::Alarm => None,
                },
                completed: true,
            },
            title: record.title.clone(),
            kind: record.timer_kind,
        }
    }

    /// The state patch carried by this event.
    #[must_use]
    pub const fn update(&self) -> &TimerUpdateEvent {
        match self {
            Self::Update(update) | Self::Completed { update, .. } => update,
        }
    }

    /// The user the event must be delivered to.
    #[must_use]
    pub const fn owner_id(&self) -> &OwnerId {
        &self.update().owner_id
    }

    /// The task the event is about.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.update().task_id
    }

    /// Check if this is a completion event.
    #[must_use]
    pub const fn is_completion(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Event type name for logging.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Update(_) => "timer_update",
            Self::Completed { .. } => "timer_completed",
        }
    }
}
