//! Timer service: task CRUD and user-issued timer operations.

use std::sync::Arc;

use tempo_core::{
    machine, Clock, Error, NewTask, OwnerId, Result, TaskId, TaskTimerRecord, TaskUpdate,
    TimerOperation, TimerSnapshot, TimerStatus, TimerStore,
};
use tempo_events::{TimerEvent, TimerEventBus, TimerUpdateEvent};
use tracing::{debug, info, warn};

use crate::registry::{ActiveTimerEntry, ActiveTimerRegistry, RegistryGuard};

/// Owns the store, the clock, the registry and the event channel producer.
///
/// Cloning is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct TimerService {
    store: Arc<dyn TimerStore>,
    clock: Arc<dyn Clock>,
    registry: Arc<ActiveTimerRegistry>,
    events: TimerEventBus,
}

impl TimerService {
    /// Create a service with an empty registry.
    pub fn new(store: Arc<dyn TimerStore>, clock: Arc<dyn Clock>, events: TimerEventBus) -> Self {
        Self {
            store,
            clock,
            registry: Arc::new(ActiveTimerRegistry::new()),
            events,
        }
    }

    /// The live timer registry.
    #[must_use]
    pub fn registry(&self) -> &ActiveTimerRegistry {
        &self.registry
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TimerStore> {
        &self.store
    }

    /// Current instant according to the service clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Rebuild the registry from every Running or Paused record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub async fn load_live(&self) -> Result<usize> {
        let records = self.store.list_live().await?;
        let mut guard = self.registry.lock().await;
        for record in &records {
            match ActiveTimerEntry::from_record(record) {
                Some(entry) => guard.insert(entry),
                None => warn!(
                    task_id = %record.id,
                    "Skipping live record with incomplete timer fields"
                ),
            }
        }

        info!(loaded = guard.len(), "Loaded live timers");
        Ok(guard.len())
    }

    /// Create an idle task.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTask` for a blank title or an invalid timer spec.
    pub async fn create_task(&self, owner: &OwnerId, new_task: NewTask) -> Result<TaskTimerRecord> {
        let title = validate_title(&new_task.title)?;
        new_task.timer.validate()?;

        let record = TaskTimerRecord::new(owner.clone(), title, new_task.timer, self.clock.now());
        self.store.upsert(&record).await?;

        info!(task_id = %record.id, owner_id = %owner, kind = %record.timer_kind, "Created task");
        Ok(record)
    }

    /// Read one of `owner`'s tasks.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task is missing or owned by someone else.
    pub async fn get_task(&self, owner: &OwnerId, task_id: &TaskId) -> Result<TaskTimerRecord> {
        self.load_owned(owner, task_id).await
    }

    /// All of `owner`'s tasks, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<TaskTimerRecord>> {
        self.store.list_by_owner(owner).await
    }

    /// Change a task's title and, while its timer is idle, its timer config.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for foreign or unknown tasks and `InvalidTask`
    /// for a blank title, an invalid spec, or a timer that has left Idle.
    pub async fn update_task(
        &self,
        owner: &OwnerId,
        task_id: &TaskId,
        update: TaskUpdate,
    ) -> Result<TaskTimerRecord> {
        let _guard = self.registry.lock().await;
        let mut record = self.load_owned(owner, task_id).await?;

        if let Some(title) = &update.title {
            record.title = validate_title(title)?;
        }

        if let Some(spec) = update.timer {
            spec.validate()?;
            if record.timer_status != TimerStatus::Idle {
                return Err(Error::invalid_task(format!(
                    "timer can only be reconfigured while idle, it is {}",
                    record.timer_status
                )));
            }
            record.configure(spec);
        }

        record.updated_at = self.clock.now();
        self.store.upsert(&record).await?;

        debug!(task_id = %record.id, "Updated task");
        Ok(record)
    }

    /// Delete a task and forget any live timer it had.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for foreign or unknown tasks.
    pub async fn delete_task(&self, owner: &OwnerId, task_id: &TaskId) -> Result<()> {
        let mut guard = self.registry.lock().await;
        self.load_owned(owner, task_id).await?;

        if !self.store.delete(task_id).await? {
            return Err(Error::task_not_found(task_id));
        }
        guard.remove(task_id);

        info!(task_id = %task_id, owner_id = %owner, "Deleted task");
        Ok(())
    }

    /// Apply a timer operation to one of `owner`'s tasks.
    ///
    /// Validation, persistence and the registry update happen under the
    /// registry guard; nothing changes when validation fails.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound`, a validation error from the state machine, or
    /// a storage error.
    pub async fn apply(
        &self,
        owner: &OwnerId,
        task_id: &TaskId,
        operation: TimerOperation,
    ) -> Result<TaskTimerRecord> {
        let mut guard = self.registry.lock().await;
        let record = self.load_owned(owner, task_id).await?;

        let now = self.clock.now();
        let next = machine::apply(&record, operation, now).inspect_err(|e| {
            debug!(
                task_id = %task_id,
                operation = %operation,
                error = %e,
                "Rejected timer operation"
            );
        })?;

        self.store.upsert(&next).await?;
        guard.sync(&next);
        self.emit(&guard, TimerEvent::Update(TimerUpdateEvent::from_record(&next, now)));

        info!(
            task_id = %task_id,
            operation = %operation,
            from = %record.timer_status,
            to = %next.timer_status,
            "Applied timer operation"
        );
        Ok(next)
    }

    /// Live status of one of `owner`'s timers.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for foreign or unknown tasks.
    pub async fn status(&self, owner: &OwnerId, task_id: &TaskId) -> Result<TimerSnapshot> {
        let record = self.load_owned(owner, task_id).await?;
        Ok(machine::snapshot(&record, self.clock.now()))
    }

    pub(crate) async fn load_owned(
        &self,
        owner: &OwnerId,
        task_id: &TaskId,
    ) -> Result<TaskTimerRecord> {
        self.store
            .get(task_id)
            .await?
            .filter(|record| record.is_owned_by(owner))
            .ok_or_else(|| Error::task_not_found(task_id))
    }

    pub(crate) async fn load(&self, task_id: &TaskId) -> Result<Option<TaskTimerRecord>> {
        self.store.get(task_id).await
    }

    pub(crate) async fn persist(&self, record: &TaskTimerRecord) -> Result<()> {
        self.store.upsert(record).await
    }

    /// Publish while the caller still holds the registry guard, keeping
    /// per-timer event order equal to persist order.
    pub(crate) fn emit(&self, _guard: &RegistryGuard<'_>, event: TimerEvent) {
        if let Err(e) = self.events.publish(event) {
            warn!(error = %e, "Dropped timer event");
        }
    }
}

impl std::fmt::Debug for TimerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerService")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_task("title must not be empty"));
    }
    Ok(trimmed.to_string())
}
