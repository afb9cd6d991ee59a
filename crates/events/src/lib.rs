//! Timer events for Tempo.
//!
//! - **Event types**: routine timer updates and completions
//! - **Event bus**: non-blocking channel from timer producers to the gateway
//! - **Wire frames**: JSON messages spoken over the push channel
//!
//! # Example
//!
//! ```ignore
//! use tempo_events::{channel, ServerMessage, TimerEvent};
//!
//! let (bus, mut stream) = channel();
//! bus.publish(TimerEvent::completed(&record))?;
//!
//! while let Some(event) = stream.recv().await {
//!     for frame in ServerMessage::frames_for(&event) {
//!         println!("{}", frame.to_json()?);
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod bus;
pub mod error;
pub mod event;
pub mod wire;

pub use bus::{channel, TimerEventBus, TimerEventStream};
pub use error::{Error, Result};
pub use event::{TimerEvent, TimerUpdateEvent};
pub use wire::{ClientMessage, ServerMessage};
