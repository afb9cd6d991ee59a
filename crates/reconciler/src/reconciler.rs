//! One reconciliation tick over the active timer registry.

use chrono::{DateTime, Utc};
use tempo_core::{machine, Result, TimerKind};
use tempo_events::{TimerEvent, TimerUpdateEvent};
use tracing::{debug, info, warn};

use crate::registry::{ActiveTimerEntry, Advance, RegistryGuard};
use crate::service::TimerService;

/// Counts from a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Running timers that published a routine update.
    pub advanced: usize,
    /// Timers that completed and were persisted.
    pub completed: usize,
    /// Paused timers left alone.
    pub skipped: usize,
    /// Entries dropped because the store no longer has them live.
    pub stale: usize,
    /// Entries whose completion failed to persist; retried next tick.
    pub failed: usize,
}

impl TickReport {
    /// Number of entries looked at.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.advanced
            .saturating_add(self.completed)
            .saturating_add(self.skipped)
            .saturating_add(self.stale)
            .saturating_add(self.failed)
    }
}

/// Drives live timers towards completion.
#[derive(Debug, Clone)]
pub struct Reconciler {
    service: TimerService,
}

impl Reconciler {
    /// Create a reconciler sharing `service`'s registry and store.
    #[must_use]
    pub const fn new(service: TimerService) -> Self {
        Self { service }
    }

    /// Run one tick at the service clock's current instant.
    ///
    /// Holds the registry guard for the whole tick. Storage failures are
    /// isolated to their entry, which stays registered for the next tick.
    pub async fn reconcile_tick(&self) -> TickReport {
        let mut guard = self.service.registry().lock().await;
        let now = self.service.now();
        let mut report = TickReport::default();

        for entry in guard.entries() {
            match entry.advance(now) {
                Advance::Paused => report.skipped = report.skipped.saturating_add(1),
                Advance::Remaining(left) => {
                    self.publish_tick(&guard, &entry, Some(left));
                    report.advanced = report.advanced.saturating_add(1);
                }
                Advance::Pending => {
                    self.publish_tick(&guard, &entry, None);
                    report.advanced = report.advanced.saturating_add(1);
                }
                Advance::Completed => match self.complete(&mut guard, &entry, now).await {
                    Ok(true) => report.completed = report.completed.saturating_add(1),
                    Ok(false) => report.stale = report.stale.saturating_add(1),
                    Err(e) => {
                        warn!(
                            task_id = %entry.task_id,
                            error = %e,
                            "Failed to persist completion, retrying next tick"
                        );
                        report.failed = report.failed.saturating_add(1);
                    }
                },
            }
        }

        debug!(
            advanced = report.advanced,
            completed = report.completed,
            skipped = report.skipped,
            stale = report.stale,
            failed = report.failed,
            "Reconciliation tick"
        );
        report
    }

    fn publish_tick(&self, guard: &RegistryGuard<'_>, entry: &ActiveTimerEntry, left: Option<u64>) {
        let update = TimerUpdateEvent::running(entry.task_id, entry.owner_id.clone(), left);
        self.service.emit(guard, TimerEvent::Update(update));
    }

    /// Persist a reached completion and publish it.
    ///
    /// Returns `Ok(false)` when the store no longer holds the task as live;
    /// the entry is dropped without an event.
    async fn complete(
        &self,
        guard: &mut RegistryGuard<'_>,
        entry: &ActiveTimerEntry,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(mut record) = self.service.load(&entry.task_id).await? else {
            debug!(task_id = %entry.task_id, "Live entry has no record, dropping");
            guard.remove(&entry.task_id);
            return Ok(false);
        };

        if !record.timer_status.is_live() {
            debug!(
                task_id = %entry.task_id,
                status = %record.timer_status,
                "Record no longer live, dropping entry"
            );
            guard.remove(&entry.task_id);
            return Ok(false);
        }

        machine::mark_completed(&mut record);
        if record.timer_kind == TimerKind::Countdown {
            record.remaining_seconds = Some(0);
        }
        record.updated_at = now;

        self.service.persist(&record).await?;
        guard.remove(&entry.task_id);
        self.service.emit(guard, TimerEvent::completed(&record));

        info!(
            task_id = %record.id,
            owner_id = %record.owner_id,
            kind = %record.timer_kind,
            "Timer completed"
        );
        Ok(true)
    }
}
