//! Background sweep of stale client windows.
//!
//! # Responsibilities
//! - Periodically evict records whose block has lapsed and whose window is
//!   two windows old
//! - Keep tracker memory bounded over long process lifetimes
//!
//! # Design Decisions
//! - Timer driven, independent of request traffic
//! - Best effort: a late or skipped sweep only costs memory, decisions are
//!   computed from the record itself

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::Shutdown;
use crate::limiter::clock::Clock;
use crate::limiter::tracker::RequestTracker;

pub struct Collector {
    tracker: Arc<RequestTracker>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Collector {
    pub fn new(tracker: Arc<RequestTracker>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            tracker,
            clock,
            interval,
        }
    }

    /// Run one sweep now. Returns the number of evicted records.
    pub fn sweep(&self) -> usize {
        let removed = self.tracker.evict_stale(self.clock.now_millis());
        tracing::debug!(
            removed,
            remaining = self.tracker.len(),
            "Collector sweep finished"
        );
        removed
    }

    /// Spawn the sweep loop on the current runtime.
    pub fn start(self) -> CollectorHandle {
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let task = tokio::spawn(self.run(receiver));
        CollectorHandle { shutdown, task }
    }

    /// Sweep on every tick until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Collector starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; there is nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Collector received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Handle to a running collector.
pub struct CollectorHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Signal the loop and wait for it to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Collector task failed");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
