//! Continuous reconciliation loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::reconciler::{Reconciler, TickReport};

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between ticks.
    pub interval: Duration,
}

impl LoopConfig {
    /// Create a config with the given tick interval.
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero interval.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("tick interval must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Continuous reconciliation loop.
///
/// Ticks the registry at a fixed interval until stopped. Nothing a tick
/// encounters ends the loop; only the stop signal does.
pub struct ReconciliationLoop {
    /// The reconciler.
    reconciler: Arc<Reconciler>,
    /// Loop configuration.
    config: LoopConfig,
    /// Stop signal receiver.
    stop_rx: watch::Receiver<bool>,
    /// Stop signal sender (for external control).
    stop_tx: watch::Sender<bool>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(reconciler: Arc<Reconciler>, config: LoopConfig) -> Result<Self> {
        config.validate()?;
        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(Self {
            reconciler,
            config,
            stop_rx,
            stop_tx,
        })
    }

    /// Run the loop until stopped. Returns the number of ticks run.
    pub async fn run(&mut self) -> u64 {
        info!(
            interval_ms = self.config.interval.as_millis(),
            "Starting reconciliation loop"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.reconcile_once().await;
                    ticks = ticks.saturating_add(1);
                    if report.completed > 0 {
                        debug!(
                            tick = ticks,
                            completed = report.completed,
                            "Timers completed this tick"
                        );
                    }
                }
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        info!(ticks, "Reconciliation loop stopped");
                        return ticks;
                    }
                }
            }
        }
    }

    /// Run a single tick.
    pub async fn reconcile_once(&self) -> TickReport {
        self.reconciler.reconcile_tick().await
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
