//! REST API routes
//!
//! - `GET /api/health` - Health check
//! - `POST /api/tasks` - Create a task with its timer
//! - `GET /api/tasks` - List the caller's tasks
//! - `GET|PATCH|DELETE /api/tasks/{id}` - Read, edit or remove a task
//! - `POST /api/tasks/{id}/timer/{operation}` - Start, pause, resume, stop or reset
//! - `GET /api/tasks/{id}/status` - Timer snapshot with live remaining time
//! - `GET /ws` - Push channel upgrade
//!
//! Everything except the health check requires a bearer token.

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub mod health;
pub mod tasks;
pub mod websocket;

/// Create the main router.
pub fn create_router() -> Router<AppState> {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/{id}/timer/{operation}", post(tasks::timer_operation))
        .route("/tasks/{id}/status", get(tasks::timer_status));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(websocket::websocket_handler))
}
