//! Core error types for timer operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{TaskId, TimerKind, TimerOperation, TimerStatus};

/// The standard Result type for Tempo core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for timer and task operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Validation errors
    #[error("{operation} is not supported for {kind} timers")]
    KindMismatch {
        operation: TimerOperation,
        kind: TimerKind,
    },

    #[error("cannot {operation} a timer that is {status}")]
    InvalidState {
        operation: TimerOperation,
        status: TimerStatus,
    },

    #[error("{kind} timer is missing required field '{field}'")]
    MissingField { kind: TimerKind, field: &'static str },

    #[error("alarm time {alarm_at} is not in the future")]
    AlarmNotInFuture { alarm_at: DateTime<Utc> },

    #[error("unknown timer operation '{name}'")]
    UnknownOperation { name: String },

    #[error("invalid task: {reason}")]
    InvalidTask { reason: String },

    // Lookup errors; ownership mismatches share this shape
    #[error("task '{task_id}' not found")]
    TaskNotFound { task_id: String },

    // Storage errors
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

impl Error {
    /// Create a kind mismatch error.
    pub const fn kind_mismatch(operation: TimerOperation, kind: TimerKind) -> Self {
        Self::KindMismatch { operation, kind }
    }

    /// Create a wrong-state error.
    pub const fn invalid_state(operation: TimerOperation, status: TimerStatus) -> Self {
        Self::InvalidState { operation, status }
    }

    /// Create a missing field error.
    pub const fn missing_field(kind: TimerKind, field: &'static str) -> Self {
        Self::MissingField { kind, field }
    }

    /// Create an invalid task error.
    pub fn invalid_task(reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            reason: reason.into(),
        }
    }

    /// Create a not found error for a task.
    pub fn task_not_found(task_id: &TaskId) -> Self {
        Self::TaskNotFound {
            task_id: task_id.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Whether this error was caused by the request itself.
    ///
    /// Validation errors are never retried and leave state untouched.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::KindMismatch { .. }
                | Self::InvalidState { .. }
                | Self::MissingField { .. }
                | Self::AlarmNotInFuture { .. }
                | Self::UnknownOperation { .. }
                | Self::InvalidTask { .. }
        )
    }

    /// Whether this error is a not-found (or not-owned) lookup failure.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound { .. })
    }
}
