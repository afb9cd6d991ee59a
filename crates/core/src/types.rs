//! Task timer records and the identifiers and enums around them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::Error;

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Ulid);

impl TaskId {
    /// Create a new unique task ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Wrap an existing ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Get the inner ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ulid>().map(Self).map_err(|_| Error::TaskNotFound {
            task_id: s.to_string(),
        })
    }
}

/// Identifier of the user owning a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner ID from a verified user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a task's timer counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Counts down a configured duration.
    Countdown,
    /// Fires at a fixed instant.
    Alarm,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Countdown => write!(f, "countdown"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

/// State of a task's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// Configured but not started.
    #[default]
    Idle,
    /// Counting.
    Running,
    /// Countdown halted with time left.
    Paused,
    /// Finished, either naturally or by Stop.
    Completed,
}

impl TimerStatus {
    /// Running or Paused timers are live and tracked by the registry.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Check if the status is terminal (only Reset leaves it).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A user-issued timer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerOperation {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
}

impl TimerOperation {
    /// All operations, in lifecycle order.
    pub const ALL: [Self; 5] = [Self::Start, Self::Pause, Self::Resume, Self::Stop, Self::Reset];

    /// The status a successful operation leaves the timer in.
    #[must_use]
    pub const fn target_status(&self) -> TimerStatus {
        match self {
            Self::Start | Self::Resume => TimerStatus::Running,
            Self::Pause => TimerStatus::Paused,
            Self::Stop => TimerStatus::Completed,
            Self::Reset => TimerStatus::Idle,
        }
    }
}

impl fmt::Display for TimerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::Stop => write!(f, "stop"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

impl FromStr for TimerOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "stop" => Ok(Self::Stop),
            "reset" => Ok(Self::Reset),
            other => Err(Error::UnknownOperation {
                name: other.to_string(),
            }),
        }
    }
}

/// Timer configuration supplied when creating or updating a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerSpec {
    Countdown { duration_seconds: u64 },
    Alarm { alarm_at: DateTime<Utc> },
}

impl TimerSpec {
    /// The kind of timer this spec configures.
    #[must_use]
    pub const fn kind(&self) -> TimerKind {
        match self {
            Self::Countdown { .. } => TimerKind::Countdown,
            Self::Alarm { .. } => TimerKind::Alarm,
        }
    }

    /// Validate the spec independent of any clock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTask` for a zero-length countdown.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Countdown { duration_seconds: 0 } => {
                Err(Error::invalid_task("countdown duration must be at least one second"))
            }
            Self::Countdown { .. } | Self::Alarm { .. } => Ok(()),
        }
    }
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub timer: TimerSpec,
}

/// Partial update of a task. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub timer: Option<TimerSpec>,
}

/// Durable record of a task and its timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTimerRecord {
    /// Task identifier
    pub id: TaskId,
    /// Owning user; every read and write is scoped by it
    pub owner_id: OwnerId,
    /// Display name
    pub title: String,
    /// Countdown or alarm
    pub timer_kind: TimerKind,
    /// Current state
    pub timer_status: TimerStatus,
    /// Configured total duration (countdown only)
    pub countdown_duration_seconds: Option<u64>,
    /// Time left as of `started_at` or while paused/idle (countdown only)
    pub remaining_seconds: Option<u64>,
    /// Instant the alarm fires (alarm only)
    pub alarm_at: Option<DateTime<Utc>>,
    /// Start of the current running period
    pub started_at: Option<DateTime<Utc>>,
    /// When the timer was paused
    pub paused_at: Option<DateTime<Utc>>,
    /// True iff status is Completed
    pub is_completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl TaskTimerRecord {
    /// Create an idle task record.
    #[must_use]
    pub fn new(
        owner_id: OwnerId,
        title: impl Into<String>,
        spec: TimerSpec,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            id: TaskId::new(),
            owner_id,
            title: title.into(),
            timer_kind: spec.kind(),
            timer_status: TimerStatus::Idle,
            countdown_duration_seconds: None,
            remaining_seconds: None,
            alarm_at: None,
            started_at: None,
            paused_at: None,
            is_completed: false,
            created_at: now,
            updated_at: now,
        };
        record.configure(spec);
        record
    }

    /// Replace the timer configuration, resetting kind-specific fields.
    pub fn configure(&mut self, spec: TimerSpec) {
        self.timer_kind = spec.kind();
        match spec {
            TimerSpec::Countdown { duration_seconds } => {
                self.countdown_duration_seconds = Some(duration_seconds);
                self.remaining_seconds = Some(duration_seconds);
                self.alarm_at = None;
            }
            TimerSpec::Alarm { alarm_at } => {
                self.countdown_duration_seconds = None;
                self.remaining_seconds = None;
                self.alarm_at = Some(alarm_at);
            }
        }
    }

    /// Check whether the record belongs to `owner`.
    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }
}

/// Live view of a timer, computed at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub task_id: TaskId,
    pub kind: TimerKind,
    pub status: TimerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_instant: Option<DateTime<Utc>>,
    pub completed: bool,
}
