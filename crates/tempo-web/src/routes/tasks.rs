//! Task endpoints: /api/tasks and the per-task timer operations

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tempo_core::{
    NewTask, TaskId, TaskTimerRecord, TaskUpdate, TimerOperation, TimerSnapshot, machine,
};

use crate::auth::AuthenticatedOwner;
use crate::error::Result;
use crate::server::AppState;

/// Response for listing tasks
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskTimerRecord>,
    pub total: usize,
}

fn task_id(raw: &str) -> Result<TaskId> {
    Ok(raw.parse()?)
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    body: std::result::Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskTimerRecord>)> {
    let Json(new_task) = body?;
    let record = state.service.create_task(&owner, new_task).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> Result<Json<TaskListResponse>> {
    let tasks = state.service.list_tasks(&owner).await?;
    let total = tasks.len();
    Ok(Json(TaskListResponse { tasks, total }))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> Result<Json<TaskTimerRecord>> {
    let record = state.service.get_task(&owner, &task_id(&id)?).await?;
    Ok(Json(record))
}

/// PATCH /api/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
    body: std::result::Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Json<TaskTimerRecord>> {
    let Json(update) = body?;
    let record = state
        .service
        .update_task(&owner, &task_id(&id)?, update)
        .await?;
    Ok(Json(record))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.service.delete_task(&owner, &task_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/{id}/timer/{operation}
///
/// Answers with the timer snapshot after the operation took effect.
pub async fn timer_operation(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path((id, operation)): Path<(String, String)>,
) -> Result<Json<TimerSnapshot>> {
    let operation: TimerOperation = operation.parse()?;
    let record = state
        .service
        .apply(&owner, &task_id(&id)?, operation)
        .await?;
    Ok(Json(machine::snapshot(&record, state.service.now())))
}

/// GET /api/tasks/{id}/status
pub async fn timer_status(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> Result<Json<TimerSnapshot>> {
    let snapshot = state.service.status(&owner, &task_id(&id)?).await?;
    Ok(Json(snapshot))
}
