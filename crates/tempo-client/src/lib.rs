//! Client-side mirror of a user's timers.
//!
//! User operations are shown immediately and reconciled against the
//! authoritative push frames from the server. Between pushes a local tick
//! keeps running timers moving on screen; only a pushed completion raises
//! an alert.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cache;
pub mod error;

pub use cache::{
    CacheEntry, ClientEffect, ClientTimerCache, PendingOperation, RefreshRequest, TimerUpdate,
    TimerView, UpdateOutcome,
};
pub use error::{CacheError, Result};
