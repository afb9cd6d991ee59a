//! Push channel connection handler
//!
//! One authenticated connection per socket. Every timer event of the
//! connection's owner is written to it; client frames are answered inline.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use tempo_core::OwnerId;
use tempo_events::{ClientMessage, ServerMessage, TimerEvent};
use tracing::{debug, info, warn};

use crate::auth::AuthenticatedOwner;
use crate::gateway::ConnectionId;
use crate::server::AppState;

/// GET /ws - push channel upgrade
///
/// The credential is checked before the upgrade, so a refused caller gets a
/// plain 401 instead of a socket.
pub async fn websocket_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, owner))
}

/// What to do after an inbound frame.
enum Reply {
    Send(ServerMessage),
    Nothing,
    Close,
}

async fn handle_socket(socket: WebSocket, state: AppState, owner: OwnerId) {
    let (id, mut outbound) = state.gateway.register(&owner).await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                let reply = match inbound {
                    Some(Ok(msg)) => process_message(msg, id),
                    Some(Err(e)) => {
                        debug!(connection_id = %id, error = %e, "Socket read failed");
                        Reply::Close
                    }
                    None => Reply::Close,
                };

                match reply {
                    Reply::Send(msg) => {
                        if send_message(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    Reply::Nothing => {}
                    Reply::Close => break,
                }
            }
            event = outbound.recv() => {
                let Some(event) = event else {
                    break;
                };
                if forward_event(&mut sender, &event).await.is_err() {
                    warn!(
                        connection_id = %id,
                        task_id = %event.task_id(),
                        "Failed to deliver event"
                    );
                    break;
                }
            }
        }
    }

    state.gateway.unregister(&owner, id).await;
    info!(owner_id = %owner, connection_id = %id, "Push connection closed");
}

fn process_message(msg: Message, id: ConnectionId) -> Reply {
    match msg {
        Message::Text(text) => handle_text_message(text.as_str(), id),
        Message::Binary(_) => Reply::Send(ServerMessage::Error {
            message: "binary frames are not supported".to_string(),
        }),
        Message::Ping(_) | Message::Pong(_) => Reply::Nothing,
        Message::Close(_) => {
            debug!(connection_id = %id, "Received close frame");
            Reply::Close
        }
    }
}

/// Subscriptions are acknowledged but do not filter delivery: a connection
/// receives every event of its owner.
fn handle_text_message(text: &str, id: ConnectionId) -> Reply {
    match ClientMessage::parse(text) {
        Ok(ClientMessage::Subscribe { task_id }) => {
            debug!(connection_id = %id, task_id = %task_id, "Subscribe");
            Reply::Send(ServerMessage::Subscribed { task_id })
        }
        Ok(ClientMessage::Unsubscribe { task_id }) => {
            debug!(connection_id = %id, task_id = %task_id, "Unsubscribe");
            Reply::Send(ServerMessage::Unsubscribed { task_id })
        }
        Ok(ClientMessage::Ping) => Reply::Send(ServerMessage::Pong),
        Err(e) => Reply::Send(ServerMessage::Error {
            message: e.to_string(),
        }),
    }
}

async fn forward_event<S>(sender: &mut S, event: &TimerEvent) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    for frame in ServerMessage::frames_for(event) {
        send_message(sender, &frame).await?;
    }
    Ok(())
}

async fn send_message<S>(sender: &mut S, msg: &ServerMessage) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match msg.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Dropping unencodable frame");
            Ok(())
        }
    }
}
