//! Internal event channel between timer producers and the connection gateway.
//!
//! Producers (the timer service and the reconciliation loop) hold a cloned
//! [`TimerEventBus`]; one consumer drains the [`TimerEventStream`]. Publishing
//! never blocks, so a slow consumer cannot stall a reconciliation tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::TimerEvent;

/// Create a connected bus and stream.
#[must_use]
pub fn channel() -> (TimerEventBus, TimerEventStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        TimerEventBus {
            sender,
            published: Arc::new(AtomicU64::new(0)),
        },
        TimerEventStream { receiver },
    )
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct TimerEventBus {
    sender: mpsc::UnboundedSender<TimerEvent>,
    published: Arc<AtomicU64>,
}

impl TimerEventBus {
    /// Publish an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` when the stream has been dropped.
    pub fn publish(&self, event: TimerEvent) -> Result<()> {
        debug!(
            event_type = event.event_type(),
            task_id = %event.task_id(),
            owner_id = %event.owner_id(),
            "Publishing event"
        );

        self.sender.send(event).map_err(|_| Error::ChannelClosed)?;
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of events accepted so far, across all clones.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Check if the consumer side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving half of the event channel.
#[derive(Debug)]
pub struct TimerEventStream {
    receiver: mpsc::UnboundedReceiver<TimerEvent>,
}

impl TimerEventStream {
    /// Receive the next event. Returns `None` once every bus clone is dropped.
    pub async fn recv(&mut self) -> Option<TimerEvent> {
        self.receiver.recv().await
    }

    /// Try to receive an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` when nothing is queued.
    pub fn try_recv(&mut self) -> Result<TimerEvent> {
        self.receiver.try_recv().map_err(|_| Error::ChannelClosed)
    }
}
