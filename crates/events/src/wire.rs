//! JSON frames exchanged over the push channel.

use serde::{Deserialize, Serialize};
use tempo_core::{TaskId, TimerKind, TimerStatus};

use crate::error::{Error, Result};
use crate::event::{TimerEvent, TimerUpdateEvent};

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a task's updates
    Subscribe { task_id: TaskId },
    /// Unsubscribe from a task's updates
    Unsubscribe { task_id: TaskId },
    /// Ping to keep connection alive
    Ping,
}

impl ClientMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` when the text is not a known client frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::invalid_message(e.to_string()))
    }
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Timer state patch
    TimerUpdate {
        task_id: TaskId,
        status: TimerStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining_seconds: Option<u64>,
        completed: bool,
    },
    /// User-facing completion alert
    Notification {
        title: String,
        message: String,
        task_id: TaskId,
    },
    /// Subscription confirmation
    Subscribed { task_id: TaskId },
    /// Unsubscription confirmation
    Unsubscribed { task_id: TaskId },
    /// Pong response to ping
    Pong,
    /// Error message
    Error { message: String },
}

impl ServerMessage {
    /// Render an internal event as the frames a connection writes, in order.
    #[must_use]
    pub fn frames_for(event: &TimerEvent) -> Vec<Self> {
        match event {
            TimerEvent::Update(update) => vec![Self::from(update)],
            TimerEvent::Completed {
                update,
                title,
                kind,
            } => vec![
                Self::from(update),
                Self::Notification {
                    title: title.clone(),
                    message: completion_message(title, *kind),
                    task_id: update.task_id,
                },
            ],
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` when the text is not a known server frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::invalid_message(e.to_string()))
    }
}

impl From<&TimerUpdateEvent> for ServerMessage {
    fn from(update: &TimerUpdateEvent) -> Self {
        Self::TimerUpdate {
            task_id: update.task_id,
            status: update.status,
            remaining_seconds: update.remaining_seconds,
            completed: update.completed,
        }
    }
}

fn completion_message(title: &str, kind: TimerKind) -> String {
    match kind {
        TimerKind::Countdown => format!("Countdown for '{title}' has finished"),
        TimerKind::Alarm => format!("Alarm for '{title}' is going off"),
    }
}
