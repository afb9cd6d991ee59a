//! Connection gateway: routes timer events to every live connection of the
//! owning user.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tempo_core::OwnerId;
use tempo_events::{TimerEvent, TimerEventStream};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Identifier of one push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue feeding one connection's writer task.
pub type Outbound = mpsc::UnboundedReceiver<TimerEvent>;

type Connections = HashMap<OwnerId, HashMap<ConnectionId, mpsc::UnboundedSender<TimerEvent>>>;

/// Owner to connections fan-out.
#[derive(Debug, Default)]
pub struct ConnectionGateway {
    connections: RwLock<Connections>,
}

impl ConnectionGateway {
    /// Create an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `owner`.
    pub async fn register(&self, owner: &OwnerId) -> (ConnectionId, Outbound) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = ConnectionId::new();

        let mut connections = self.connections.write().await;
        connections.entry(owner.clone()).or_default().insert(id, sender);

        info!(owner_id = %owner, connection_id = %id, "Connection registered");
        (id, receiver)
    }

    /// Remove a connection. The owner is evicted once it has none left.
    pub async fn unregister(&self, owner: &OwnerId, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let Some(owned) = connections.get_mut(owner) else {
            return false;
        };

        let removed = owned.remove(&id).is_some();
        if owned.is_empty() {
            connections.remove(owner);
        }

        if removed {
            info!(owner_id = %owner, connection_id = %id, "Connection unregistered");
        }
        removed
    }

    /// Deliver `event` to every connection of `owner`.
    ///
    /// Returns the number of connections the event was queued for. Never
    /// waits on socket I/O; a failed enqueue is logged and skipped.
    pub async fn publish(&self, owner: &OwnerId, event: &TimerEvent) -> usize {
        let connections = self.connections.read().await;
        let Some(owned) = connections.get(owner) else {
            return 0;
        };

        owned
            .iter()
            .filter(|(id, sender)| match sender.send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    warn!(
                        owner_id = %owner,
                        connection_id = %id,
                        "Connection queue closed, skipping"
                    );
                    false
                }
            })
            .count()
    }

    /// Number of live connections for `owner`.
    pub async fn connection_count(&self, owner: &OwnerId) -> usize {
        self.connections
            .read()
            .await
            .get(owner)
            .map_or(0, HashMap::len)
    }

    /// Number of owners with at least one connection.
    pub async fn owner_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Drain the internal event channel into the gateway until every producer
/// is gone.
pub fn spawn_dispatcher(
    gateway: Arc<ConnectionGateway>,
    mut stream: TimerEventStream,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Event dispatcher started");
        while let Some(event) = stream.recv().await {
            let delivered = gateway.publish(event.owner_id(), &event).await;
            debug!(
                event_type = event.event_type(),
                task_id = %event.task_id(),
                delivered,
                "Dispatched event"
            );
        }
        info!("Event dispatcher stopped");
    })
}
