//! Cache errors.

use tempo_core::{TaskId, TimerOperation};
use thiserror::Error;

/// Errors returned by the client timer cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("task {task_id} is not cached")]
    UnknownTask { task_id: TaskId },

    #[error("task {task_id} already has a pending {operation}")]
    OperationPending {
        task_id: TaskId,
        operation: TimerOperation,
    },

    #[error("task {task_id} has no pending operation")]
    NotPending { task_id: TaskId },
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
