//! REST API integration tests

use std::sync::Arc;

use anyhow::Result;
use axum_test::TestServer;
use http::StatusCode;
use serde_json::{Value, json};
use tempo_core::{InMemoryTimerStore, ManualClock};
use tempo_events::TimerEventStream;
use tempo_reconciler::TimerService;
use tempo_web::{AppState, ConnectionGateway, ServerConfig, SignedTokenVerifier, create_app};

const SECRET: &str = "test-secret";

struct Fixture {
    server: TestServer,
    clock: Arc<ManualClock>,
    alice: String,
    bob: String,
    _events: TimerEventStream,
}

fn create_fixture() -> Result<Fixture> {
    let clock = Arc::new(ManualClock::starting_now());
    let (bus, events) = tempo_events::channel();
    let service = TimerService::new(Arc::new(InMemoryTimerStore::new()), clock.clone(), bus);

    let verifier = SignedTokenVerifier::new(SECRET);
    let alice = verifier.issue("alice");
    let bob = verifier.issue("bob");

    let state = AppState::new(service, Arc::new(ConnectionGateway::new()), Arc::new(verifier));
    let app = create_app(state, &ServerConfig::default())?;

    Ok(Fixture {
        server: TestServer::new(app)?,
        clock,
        alice,
        bob,
        _events: events,
    })
}

async fn create_countdown(fx: &Fixture, title: &str, secs: u64) -> Result<String> {
    let response = fx
        .server
        .post("/api/tasks")
        .authorization_bearer(&fx.alice)
        .json(&json!({
            "title": title,
            "timer": { "kind": "countdown", "duration_seconds": secs }
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    body["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("created task has no id"))
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_health_check_is_public() -> Result<()> {
    let fx = create_fixture()?;

    let response = fx.server.get("/api/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_missing_token_returns_401() -> Result<()> {
    let fx = create_fixture()?;

    let response = fx.server.get("/api/tasks").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["status"], 401);
    Ok(())
}

#[tokio::test]
async fn test_forged_token_returns_401() -> Result<()> {
    let fx = create_fixture()?;
    let forged = SignedTokenVerifier::new("not-the-secret").issue("alice");

    let response = fx
        .server
        .get("/api/tasks")
        .authorization_bearer(forged)
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_push_channel_requires_token() -> Result<()> {
    let fx = create_fixture()?;

    let response = fx.server.get("/ws").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

// ============================================================================
// Task CRUD
// ============================================================================

#[tokio::test]
async fn test_create_then_list_tasks() -> Result<()> {
    let fx = create_fixture()?;
    let id = create_countdown(&fx, "Tea", 180).await?;

    let response = fx
        .server
        .get("/api/tasks")
        .authorization_bearer(&fx.alice)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["id"], id.as_str());
    assert_eq!(body["tasks"][0]["timer_kind"], "countdown");
    assert_eq!(body["tasks"][0]["timer_status"], "idle");
    assert_eq!(body["tasks"][0]["remaining_seconds"], 180);
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_blank_title_and_bad_body() -> Result<()> {
    let fx = create_fixture()?;

    let blank = fx
        .server
        .post("/api/tasks")
        .authorization_bearer(&fx.alice)
        .json(&json!({
            "title": "   ",
            "timer": { "kind": "countdown", "duration_seconds": 60 }
        }))
        .await;
    assert_eq!(blank.status_code(), StatusCode::BAD_REQUEST);

    let malformed = fx
        .server
        .post("/api/tasks")
        .authorization_bearer(&fx.alice)
        .json(&json!({ "title": "Tea" }))
        .await;
    assert!(malformed.status_code().is_client_error());
    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_task() -> Result<()> {
    let fx = create_fixture()?;
    let id = create_countdown(&fx, "Tea", 180).await?;

    let patched = fx
        .server
        .patch(&format!("/api/tasks/{id}"))
        .authorization_bearer(&fx.alice)
        .json(&json!({ "title": "Green tea" }))
        .await;
    assert_eq!(patched.status_code(), StatusCode::OK);
    let body: Value = patched.json();
    assert_eq!(body["title"], "Green tea");
    assert_eq!(body["remaining_seconds"], 180);

    let deleted = fx
        .server
        .delete(&format!("/api/tasks/{id}"))
        .authorization_bearer(&fx.alice)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let gone = fx
        .server
        .get(&format!("/api/tasks/{id}"))
        .authorization_bearer(&fx.alice)
        .await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_foreign_task_is_not_found() -> Result<()> {
    let fx = create_fixture()?;
    let id = create_countdown(&fx, "Tea", 180).await?;

    let read = fx
        .server
        .get(&format!("/api/tasks/{id}"))
        .authorization_bearer(&fx.bob)
        .await;
    assert_eq!(read.status_code(), StatusCode::NOT_FOUND);

    let start = fx
        .server
        .post(&format!("/api/tasks/{id}/timer/start"))
        .authorization_bearer(&fx.bob)
        .await;
    assert_eq!(start.status_code(), StatusCode::NOT_FOUND);

    let listed = fx
        .server
        .get("/api/tasks")
        .authorization_bearer(&fx.bob)
        .await;
    let body: Value = listed.json();
    assert_eq!(body["total"], 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_task_id_is_not_found() -> Result<()> {
    let fx = create_fixture()?;

    let response = fx
        .server
        .get("/api/tasks/not-a-ulid")
        .authorization_bearer(&fx.alice)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

// ============================================================================
// Timer operations
// ============================================================================

#[tokio::test]
async fn test_start_then_status_reports_live_remaining() -> Result<()> {
    let fx = create_fixture()?;
    let id = create_countdown(&fx, "Tea", 60).await?;

    let started = fx
        .server
        .post(&format!("/api/tasks/{id}/timer/start"))
        .authorization_bearer(&fx.alice)
        .await;
    assert_eq!(started.status_code(), StatusCode::OK);
    let body: Value = started.json();
    assert_eq!(body["status"], "running");
    assert_eq!(body["remaining_seconds"], 60);

    fx.clock.advance_secs(15);

    let status = fx
        .server
        .get(&format!("/api/tasks/{id}/status"))
        .authorization_bearer(&fx.alice)
        .await;
    assert_eq!(status.status_code(), StatusCode::OK);
    let body: Value = status.json();
    assert_eq!(body["status"], "running");
    assert_eq!(body["remaining_seconds"], 45);
    assert_eq!(body["completed"], false);
    Ok(())
}

#[tokio::test]
async fn test_unknown_operation_returns_400() -> Result<()> {
    let fx = create_fixture()?;
    let id = create_countdown(&fx, "Tea", 60).await?;

    let response = fx
        .server
        .post(&format!("/api/tasks/{id}/timer/snooze"))
        .authorization_bearer(&fx.alice)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_wrong_state_returns_409_and_leaves_timer_alone() -> Result<()> {
    let fx = create_fixture()?;
    let id = create_countdown(&fx, "Tea", 60).await?;

    let response = fx
        .server
        .post(&format!("/api/tasks/{id}/timer/pause"))
        .authorization_bearer(&fx.alice)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["status"], 409);

    let status = fx
        .server
        .get(&format!("/api/tasks/{id}/status"))
        .authorization_bearer(&fx.alice)
        .await;
    let body: Value = status.json();
    assert_eq!(body["status"], "idle");
    Ok(())
}

#[tokio::test]
async fn test_alarm_in_the_past_is_rejected() -> Result<()> {
    let fx = create_fixture()?;
    let past = chrono::Utc::now() - chrono::Duration::minutes(5);

    let created = fx
        .server
        .post("/api/tasks")
        .authorization_bearer(&fx.alice)
        .json(&json!({
            "title": "Standup",
            "timer": { "kind": "alarm", "alarm_at": past }
        }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let body: Value = created.json();
    let id = body["id"].as_str().unwrap_or_default().to_string();

    let response = fx
        .server
        .post(&format!("/api/tasks/{id}/timer/start"))
        .authorization_bearer(&fx.alice)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}
