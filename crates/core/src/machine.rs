//! Timer state machine.
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --resume--> Running
//!                 Running --stop---> Completed <--stop-- Paused
//!                 any     --reset--> Idle
//! ```
//!
//! Transitions are pure: [`apply`] validates against the current record and
//! returns the next record, leaving its input untouched. Callers persist the
//! returned record as one unit; a validation failure means nothing changes.

use chrono::{DateTime, Utc};

use crate::clock::elapsed_secs;
use crate::error::{Error, Result};
use crate::types::{TaskTimerRecord, TimerKind, TimerOperation, TimerSnapshot, TimerStatus};

/// Apply `operation` to `record` at instant `now`.
///
/// # Errors
///
/// Returns a validation error when the operation does not fit the timer's
/// kind, current status, or configuration.
pub fn apply(
    record: &TaskTimerRecord,
    operation: TimerOperation,
    now: DateTime<Utc>,
) -> Result<TaskTimerRecord> {
    let mut next = record.clone();
    match operation {
        TimerOperation::Start => start(&mut next, now)?,
        TimerOperation::Pause => pause(&mut next, now)?,
        TimerOperation::Resume => resume(&mut next, now)?,
        TimerOperation::Stop => stop(&mut next, now)?,
        TimerOperation::Reset => reset(&mut next),
    }
    next.updated_at = now;
    Ok(next)
}

fn start(record: &mut TaskTimerRecord, now: DateTime<Utc>) -> Result<()> {
    if record.timer_status != TimerStatus::Idle {
        return Err(Error::invalid_state(
            TimerOperation::Start,
            record.timer_status,
        ));
    }

    match record.timer_kind {
        TimerKind::Countdown => {
            let duration = record
                .countdown_duration_seconds
                .ok_or(Error::missing_field(
                    TimerKind::Countdown,
                    "countdown_duration_seconds",
                ))?;
            record.remaining_seconds = Some(duration);
        }
        TimerKind::Alarm => {
            let alarm_at = record
                .alarm_at
                .ok_or(Error::missing_field(TimerKind::Alarm, "alarm_at"))?;
            if alarm_at <= now {
                return Err(Error::AlarmNotInFuture { alarm_at });
            }
        }
    }

    record.timer_status = TimerStatus::Running;
    record.started_at = Some(now);
    record.paused_at = None;
    record.is_completed = false;
    Ok(())
}

fn pause(record: &mut TaskTimerRecord, now: DateTime<Utc>) -> Result<()> {
    require_countdown(record, TimerOperation::Pause)?;
    if record.timer_status != TimerStatus::Running {
        return Err(Error::invalid_state(
            TimerOperation::Pause,
            record.timer_status,
        ));
    }

    record.remaining_seconds = live_remaining(record, now);
    record.timer_status = TimerStatus::Paused;
    record.paused_at = Some(now);
    record.started_at = None;
    Ok(())
}

fn resume(record: &mut TaskTimerRecord, now: DateTime<Utc>) -> Result<()> {
    require_countdown(record, TimerOperation::Resume)?;
    if record.timer_status != TimerStatus::Paused {
        return Err(Error::invalid_state(
            TimerOperation::Resume,
            record.timer_status,
        ));
    }

    record.timer_status = TimerStatus::Running;
    record.started_at = Some(now);
    record.paused_at = None;
    Ok(())
}

fn stop(record: &mut TaskTimerRecord, now: DateTime<Utc>) -> Result<()> {
    if !record.timer_status.is_live() {
        return Err(Error::invalid_state(
            TimerOperation::Stop,
            record.timer_status,
        ));
    }

    // Keep whatever time was left when the user stopped it.
    if record.timer_kind == TimerKind::Countdown {
        record.remaining_seconds = live_remaining(record, now);
    }
    mark_completed(record);
    Ok(())
}

fn reset(record: &mut TaskTimerRecord) {
    record.timer_status = TimerStatus::Idle;
    record.started_at = None;
    record.paused_at = None;
    record.is_completed = false;
    if record.timer_kind == TimerKind::Countdown {
        record.remaining_seconds = record.countdown_duration_seconds;
    }
}

fn require_countdown(record: &TaskTimerRecord, operation: TimerOperation) -> Result<()> {
    match record.timer_kind {
        TimerKind::Countdown => Ok(()),
        TimerKind::Alarm => Err(Error::kind_mismatch(operation, TimerKind::Alarm)),
    }
}

/// Move a live record into Completed, clearing its running timestamps.
pub fn mark_completed(record: &mut TaskTimerRecord) {
    record.timer_status = TimerStatus::Completed;
    record.is_completed = true;
    record.started_at = None;
    record.paused_at = None;
}

/// Countdown time left at `now`; `None` for alarms.
///
/// Running countdowns subtract the time elapsed since `started_at` from the
/// snapshot, never going below zero. Other states return the snapshot as is.
#[must_use]
pub fn live_remaining(record: &TaskTimerRecord, now: DateTime<Utc>) -> Option<u64> {
    match record.timer_kind {
        TimerKind::Alarm => None,
        TimerKind::Countdown => {
            let snapshot = record.remaining_seconds?;
            match (record.timer_status, record.started_at) {
                (TimerStatus::Running, Some(started_at)) => {
                    Some(snapshot.saturating_sub(elapsed_secs(started_at, now)))
                }
                _ => Some(snapshot),
            }
        }
    }
}

/// Live status view of a record at `now`.
#[must_use]
pub fn snapshot(record: &TaskTimerRecord, now: DateTime<Utc>) -> TimerSnapshot {
    TimerSnapshot {
        task_id: record.id,
        kind: record.timer_kind,
        status: record.timer_status,
        remaining_seconds: live_remaining(record, now),
        started_at: record.started_at,
        end_instant: match record.timer_kind {
            TimerKind::Alarm => record.alarm_at,
            TimerKind::Countdown => None,
        },
        completed: record.is_completed,
    }
}
