//! Live timer tracking and reconciliation for Tempo.
//!
//! - **Registry**: process-local map of Running and Paused timers, rebuilt
//!   from the store at start-up
//! - **Service**: task CRUD and timer operations, each applied under the
//!   registry guard
//! - **Reconciler**: one tick that publishes updates and persists completions
//! - **Loop**: fixed-interval driver with a stop handle
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tempo_core::{InMemoryTimerStore, SystemClock};
//! use tempo_reconciler::{LoopConfig, Reconciler, ReconciliationLoop, TimerService};
//!
//! let (bus, stream) = tempo_events::channel();
//! let service = TimerService::new(
//!     Arc::new(InMemoryTimerStore::new()),
//!     Arc::new(SystemClock),
//!     bus,
//! );
//! service.load_live().await?;
//!
//! let mut runner = ReconciliationLoop::new(
//!     Arc::new(Reconciler::new(service.clone())),
//!     LoopConfig::default(),
//! )?;
//! let stopper = runner.stopper();
//! tokio::spawn(async move { runner.run().await });
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod r#loop;
pub mod reconciler;
pub mod registry;
pub mod service;

pub use error::{Error, Result};
pub use r#loop::{LoopConfig, LoopStopper, ReconciliationLoop};
pub use reconciler::{Reconciler, TickReport};
pub use registry::{ActiveTimerEntry, ActiveTimerRegistry, Advance, Deadline, RegistryGuard};
pub use service::TimerService;
