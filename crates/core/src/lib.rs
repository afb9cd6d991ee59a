//! Core timer model for Tempo.
//!
//! - **Records**: durable task timer records and their identifiers
//! - **State machine**: pure start/pause/resume/stop/reset transitions
//! - **Clock**: wall and manual time sources
//! - **Store**: persistence trait with in-memory and SurrealDB backends
//!
//! # Example
//!
//! ```ignore
//! use tempo_core::{machine, OwnerId, TaskTimerRecord, TimerOperation, TimerSpec};
//!
//! let now = chrono::Utc::now();
//! let record = TaskTimerRecord::new(
//!     OwnerId::new("alice"),
//!     "Tea",
//!     TimerSpec::Countdown { duration_seconds: 180 },
//!     now,
//! );
//! let running = machine::apply(&record, TimerOperation::Start, now)?;
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod error;
pub mod machine;
pub mod store;
pub mod surreal;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use store::{InMemoryTimerStore, TimerStore};
pub use surreal::{Credentials, StoreConfig, SurrealTimerStore};
pub use types::{
    NewTask, OwnerId, TaskId, TaskTimerRecord, TaskUpdate, TimerKind, TimerOperation,
    TimerSnapshot, TimerSpec, TimerStatus,
};
