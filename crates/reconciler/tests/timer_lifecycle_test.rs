//! Timer lifecycle tests driven by a manual clock.
//!
//! Tests verify that:
//! - Countdowns pause, resume and complete exactly once with zero remaining
//! - Alarms complete on their instant and refuse past instants
//! - Completion and user operations never interleave on the same timer
//! - The registry is rebuilt from the store and survives storage failures

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tempo_core::{
    Clock, Error, InMemoryTimerStore, ManualClock, NewTask, OwnerId, TaskId, TaskTimerRecord,
    TimerOperation, TimerSpec, TimerStatus, TimerStore,
};
use tempo_events::{TimerEvent, TimerEventStream};
use tempo_reconciler::{Reconciler, TimerService};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

struct Harness {
    service: TimerService,
    reconciler: Reconciler,
    clock: Arc<ManualClock>,
    stream: TimerEventStream,
    owner: OwnerId,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(Arc::new(InMemoryTimerStore::new()))
    }

    fn with_store(store: Arc<dyn TimerStore>) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let (bus, stream) = tempo_events::channel();
        let service = TimerService::new(store, clock.clone(), bus);
        Self {
            reconciler: Reconciler::new(service.clone()),
            service,
            clock,
            stream,
            owner: OwnerId::new("alice"),
        }
    }

    async fn countdown(&self, secs: u64) -> tempo_core::Result<TaskTimerRecord> {
        self.service
            .create_task(
                &self.owner,
                NewTask {
                    title: "Oven".to_string(),
                    timer: TimerSpec::Countdown {
                        duration_seconds: secs,
                    },
                },
            )
            .await
    }

    async fn alarm_in(&self, secs: i64) -> tempo_core::Result<TaskTimerRecord> {
        self.service
            .create_task(
                &self.owner,
                NewTask {
                    title: "Meeting".to_string(),
                    timer: TimerSpec::Alarm {
                        alarm_at: self.clock.now() + Duration::seconds(secs),
                    },
                },
            )
            .await
    }

    async fn apply(&self, id: &TaskId, op: TimerOperation) -> tempo_core::Result<TaskTimerRecord> {
        self.service.apply(&self.owner, id, op).await
    }

    fn drain(&mut self) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.stream.try_recv() {
            events.push(event);
        }
        events
    }
}

fn completions(events: &[TimerEvent]) -> Vec<&TimerEvent> {
    events.iter().filter(|event| event.is_completion()).collect()
}

// ==========================================================================
// COUNTDOWN TESTS
// ==========================================================================

#[tokio::test]
async fn countdown_pause_resume_completes_exactly_once() -> TestResult {
    // GIVEN: a 10 second countdown paused after 4 seconds
    let mut h = Harness::new();
    let task = h.countdown(10).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.clock.advance_secs(4);
    let paused = h.apply(&task.id, TimerOperation::Pause).await?;
    assert_eq!(paused.remaining_seconds, Some(6));

    // Paused time does not count.
    h.clock.advance_secs(100);
    let status = h.service.status(&h.owner, &task.id).await?;
    assert_eq!(status.remaining_seconds, Some(6));

    // WHEN: resumed and ticked once per second
    h.apply(&task.id, TimerOperation::Resume).await?;
    h.drain();

    for second in 1..=5u64 {
        h.clock.advance_secs(1);
        let report = h.reconciler.reconcile_tick().await;
        assert_eq!(report.advanced, 1, "tick {second} should advance");
        assert_eq!(report.completed, 0);
    }
    let before_zero = h.drain();
    assert!(completions(&before_zero).is_empty());
    assert_eq!(
        before_zero.last().and_then(|e| e.update().remaining_seconds),
        Some(1)
    );

    h.clock.advance_secs(1);
    let report = h.reconciler.reconcile_tick().await;

    // THEN: exactly one completion with zero remaining
    assert_eq!(report.completed, 1);
    let events = h.drain();
    let done = completions(&events);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].update().remaining_seconds, Some(0));
    assert_eq!(done[0].update().status, TimerStatus::Completed);
    assert!(done[0].update().completed);

    let stored = h.service.get_task(&h.owner, &task.id).await?;
    assert_eq!(stored.timer_status, TimerStatus::Completed);
    assert_eq!(stored.remaining_seconds, Some(0));
    assert!(stored.is_completed);
    assert_eq!(stored.started_at, None);
    assert!(h.service.registry().lock().await.is_empty());

    // Further ticks publish nothing.
    h.clock.advance_secs(1);
    assert_eq!(h.reconciler.reconcile_tick().await.total(), 0);
    assert!(h.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn overdue_countdown_completes_in_one_tick() -> TestResult {
    let mut h = Harness::new();
    let task = h.countdown(3).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.clock.advance_secs(30);

    let report = h.reconciler.reconcile_tick().await;
    assert_eq!(report.completed, 1);
    assert_eq!(completions(&h.drain()).len(), 1);
    Ok(())
}

#[tokio::test]
async fn paused_timer_is_skipped_by_tick() -> TestResult {
    let mut h = Harness::new();
    let task = h.countdown(5).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.apply(&task.id, TimerOperation::Pause).await?;
    h.drain();

    h.clock.advance_secs(60);
    let report = h.reconciler.reconcile_tick().await;
    assert_eq!(report.skipped, 1);
    assert!(h.drain().is_empty());
    Ok(())
}

// ==========================================================================
// ALARM TESTS
// ==========================================================================

#[tokio::test]
async fn alarm_completes_after_five_ticks() -> TestResult {
    let mut h = Harness::new();
    let task = h.alarm_in(5).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.drain();

    for _ in 0..4 {
        h.clock.advance_secs(1);
        let report = h.reconciler.reconcile_tick().await;
        assert_eq!(report.advanced, 1);
    }
    let pending = h.drain();
    assert!(completions(&pending).is_empty());
    assert!(pending.iter().all(|e| e.update().remaining_seconds.is_none()));

    h.clock.advance_secs(1);
    assert_eq!(h.reconciler.reconcile_tick().await.completed, 1);

    let events = h.drain();
    let done = completions(&events);
    assert_eq!(done.len(), 1);
    assert!(matches!(
        done[0],
        TimerEvent::Completed { title, .. } if title == "Meeting"
    ));
    Ok(())
}

#[tokio::test]
async fn past_alarm_is_rejected_without_mutation() -> TestResult {
    let h = Harness::new();
    let task = h.alarm_in(-1).await?;

    let result = h.apply(&task.id, TimerOperation::Start).await;
    assert!(matches!(result, Err(Error::AlarmNotInFuture { .. })));

    let stored = h.service.get_task(&h.owner, &task.id).await?;
    assert_eq!(stored, task);
    assert!(h.service.registry().lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn alarm_rejects_pause() -> TestResult {
    let h = Harness::new();
    let task = h.alarm_in(30).await?;
    h.apply(&task.id, TimerOperation::Start).await?;

    let result = h.apply(&task.id, TimerOperation::Pause).await;
    assert!(matches!(result, Err(Error::KindMismatch { .. })));
    Ok(())
}

// ==========================================================================
// OPERATION TESTS
// ==========================================================================

#[tokio::test]
async fn reset_from_any_state_restores_defaults() -> TestResult {
    let h = Harness::new();
    let setups: [&[TimerOperation]; 4] = [
        &[],
        &[TimerOperation::Start],
        &[TimerOperation::Start, TimerOperation::Pause],
        &[TimerOperation::Start, TimerOperation::Stop],
    ];

    for ops in setups {
        let task = h.countdown(90).await?;
        for op in ops {
            h.clock.advance_secs(7);
            h.apply(&task.id, *op).await?;
        }

        let reset = h.apply(&task.id, TimerOperation::Reset).await?;
        assert_eq!(reset.timer_status, TimerStatus::Idle);
        assert_eq!(reset.remaining_seconds, Some(90));
        assert_eq!(reset.started_at, None);
        assert_eq!(reset.paused_at, None);
        assert!(!reset.is_completed);
        assert!(h.service.registry().lock().await.get(&task.id).is_none());
    }
    Ok(())
}

#[tokio::test]
async fn stop_publishes_update_without_notification() -> TestResult {
    let mut h = Harness::new();
    let task = h.countdown(60).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.clock.advance_secs(20);
    h.drain();

    let stopped = h.apply(&task.id, TimerOperation::Stop).await?;
    assert_eq!(stopped.timer_status, TimerStatus::Completed);
    assert_eq!(stopped.remaining_seconds, Some(40));

    let events = h.drain();
    assert_eq!(events.len(), 1);
    assert!(!events[0].is_completion());
    assert_eq!(events[0].update().status, TimerStatus::Completed);
    assert!(events[0].update().completed);
    Ok(())
}

#[tokio::test]
async fn late_pause_after_completion_is_wrong_state() -> TestResult {
    let h = Harness::new();
    let task = h.countdown(2).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.clock.advance_secs(2);
    h.reconciler.reconcile_tick().await;

    let result = h.apply(&task.id, TimerOperation::Pause).await;
    assert!(matches!(
        result,
        Err(Error::InvalidState {
            status: TimerStatus::Completed,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn foreign_owner_sees_not_found() -> TestResult {
    let h = Harness::new();
    let task = h.countdown(10).await?;
    let mallory = OwnerId::new("mallory");

    assert!(h.service.get_task(&mallory, &task.id).await.is_err_and(|e| e.is_not_found()));
    assert!(h.service.status(&mallory, &task.id).await.is_err_and(|e| e.is_not_found()));
    assert!(
        h.service
            .apply(&mallory, &task.id, TimerOperation::Start)
            .await
            .is_err_and(|e| e.is_not_found())
    );
    assert!(h.service.delete_task(&mallory, &task.id).await.is_err_and(|e| e.is_not_found()));
    assert!(h.service.list_tasks(&mallory).await?.is_empty());

    let stored = h.service.get_task(&h.owner, &task.id).await?;
    assert_eq!(stored.timer_status, TimerStatus::Idle);
    Ok(())
}

#[tokio::test]
async fn deleting_running_task_drops_entry() -> TestResult {
    let mut h = Harness::new();
    let task = h.countdown(10).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.service.delete_task(&h.owner, &task.id).await?;
    h.drain();

    h.clock.advance_secs(10);
    assert_eq!(h.reconciler.reconcile_tick().await.total(), 0);
    assert!(h.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn timer_config_changes_only_while_idle() -> TestResult {
    let h = Harness::new();
    let task = h.countdown(10).await?;
    let to_alarm = tempo_core::TaskUpdate {
        title: Some("Renamed".to_string()),
        timer: Some(TimerSpec::Alarm {
            alarm_at: h.clock.now() + Duration::minutes(5),
        }),
    };

    let updated = h.service.update_task(&h.owner, &task.id, to_alarm.clone()).await?;
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.remaining_seconds, None);

    h.apply(&task.id, TimerOperation::Start).await?;
    let result = h.service.update_task(&h.owner, &task.id, to_alarm).await;
    assert!(matches!(result, Err(Error::InvalidTask { .. })));
    Ok(())
}

// ==========================================================================
// RECOVERY TESTS
// ==========================================================================

#[tokio::test]
async fn registry_is_rebuilt_from_store() -> TestResult {
    let store: Arc<dyn TimerStore> = Arc::new(InMemoryTimerStore::new());
    let first = Harness::with_store(store.clone());
    let running = first.countdown(5).await?;
    let paused = first.countdown(5).await?;
    first.countdown(5).await?;
    first.apply(&running.id, TimerOperation::Start).await?;
    first.apply(&paused.id, TimerOperation::Start).await?;
    first.apply(&paused.id, TimerOperation::Pause).await?;

    // A fresh process over the same store.
    let mut second = Harness::with_store(store);
    second.clock.set(first.clock.now());
    assert_eq!(second.service.load_live().await?, 2);

    second.clock.advance_secs(5);
    let report = second.reconciler.reconcile_tick().await;
    assert_eq!(report.completed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(completions(&second.drain()).len(), 1);
    Ok(())
}

#[tokio::test]
async fn stale_entry_is_dropped_without_event() -> TestResult {
    let mut h = Harness::new();
    let task = h.countdown(1).await?;
    let started = h.apply(&task.id, TimerOperation::Start).await?;

    // Store changed behind the registry's back.
    let mut idle = started.clone();
    idle.timer_status = TimerStatus::Idle;
    idle.started_at = None;
    h.service.store().upsert(&idle).await?;
    h.drain();

    h.clock.advance_secs(1);
    let report = h.reconciler.reconcile_tick().await;
    assert_eq!(report.stale, 1);
    assert!(h.drain().is_empty());
    assert!(h.service.registry().lock().await.is_empty());
    Ok(())
}

/// Store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryTimerStore,
    failing: AtomicBool,
}

#[async_trait]
impl TimerStore for FlakyStore {
    async fn get(&self, task_id: &TaskId) -> tempo_core::Result<Option<TaskTimerRecord>> {
        self.inner.get(task_id).await
    }

    async fn upsert(&self, record: &TaskTimerRecord) -> tempo_core::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::storage("disk unavailable"));
        }
        self.inner.upsert(record).await
    }

    async fn delete(&self, task_id: &TaskId) -> tempo_core::Result<bool> {
        self.inner.delete(task_id).await
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> tempo_core::Result<Vec<TaskTimerRecord>> {
        self.inner.list_by_owner(owner).await
    }

    async fn list_live(&self) -> tempo_core::Result<Vec<TaskTimerRecord>> {
        self.inner.list_live().await
    }
}

#[tokio::test]
async fn storage_failure_during_tick_is_retried() -> TestResult {
    let store = Arc::new(FlakyStore::default());
    let mut h = Harness::with_store(store.clone());
    let task = h.countdown(2).await?;
    h.apply(&task.id, TimerOperation::Start).await?;
    h.drain();

    store.failing.store(true, Ordering::SeqCst);
    h.clock.advance_secs(2);
    let report = h.reconciler.reconcile_tick().await;
    assert_eq!(report.failed, 1);
    assert!(completions(&h.drain()).is_empty());
    assert!(h.service.registry().lock().await.get(&task.id).is_some());

    store.failing.store(false, Ordering::SeqCst);
    let report = h.reconciler.reconcile_tick().await;
    assert_eq!(report.completed, 1);
    assert_eq!(completions(&h.drain()).len(), 1);
    Ok(())
}
