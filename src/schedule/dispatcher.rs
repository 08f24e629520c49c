//! Clock-driven dispatch loop

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::util::time::{SimulationClock, DISPATCH_INTERVAL};

use super::{EventRegistry, StopSignal, TimeBucket};

/// Dispatch counters
#[derive(Debug, Default)]
pub struct DispatchStats {
    ticks: AtomicU64,
    buckets: AtomicU64,
    fired: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub ticks: u64,
    /// Buckets taken from the registry, including empty ones
    pub buckets: u64,
    /// Callbacks that returned `Ok`
    pub fired: u64,
    /// Callbacks that returned `Err` or panicked
    pub failed: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            buckets: self.buckets.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fires registered callbacks as the clock crosses each whole second
pub struct Dispatcher {
    clock: SimulationClock,
    registry: Arc<EventRegistry>,
    stop: StopSignal,
    stats: Arc<DispatchStats>,
    next_bucket: TimeBucket,
}

impl Dispatcher {
    pub fn new(clock: SimulationClock, registry: Arc<EventRegistry>, stop: StopSignal) -> Self {
        Self {
            clock,
            registry,
            stop,
            stats: Arc::new(DispatchStats::default()),
            next_bucket: 0,
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> DispatcherHandle {
        let stop = self.stop.clone();
        let stats = self.stats.clone();
        let task = tokio::spawn(self.run());
        DispatcherHandle { stop, stats, task }
    }

    /// Start the clock and tick at 1 Hz until stopped.
    ///
    /// Ticks are anchored to the clock's start instant, so the first tick
    /// handles bucket 0 and tick `n` lands on elapsed `n` seconds.
    pub async fn run(mut self) {
        let start = self.clock.start();
        info!("Dispatcher started");

        let mut ticker = interval_at(start, DISPATCH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.stopped() => break,
                _ = ticker.tick() => {}
            }

            self.stats.ticks.fetch_add(1, Ordering::Relaxed);
            let current = self.clock.bucket();
            self.catch_up(current);
        }

        let stats = self.stats.snapshot();
        info!(
            ticks = stats.ticks,
            fired = stats.fired,
            failed = stats.failed,
            "Dispatcher stopped"
        );
    }

    /// Dispatch every bucket from the last one handled up to `current`.
    /// After a stall the skipped buckets still fire, in ascending order.
    fn catch_up(&mut self, current: TimeBucket) {
        while self.next_bucket <= current {
            self.dispatch_bucket(self.next_bucket);
            self.next_bucket += 1;
        }
    }

    fn dispatch_bucket(&self, bucket: TimeBucket) {
        let callbacks = self.registry.take(bucket);
        self.stats.buckets.fetch_add(1, Ordering::Relaxed);
        if callbacks.is_empty() {
            return;
        }

        debug!(bucket, count = callbacks.len(), "Firing bucket");

        for (index, callback) in callbacks.into_iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(callback)) {
                Ok(Ok(())) => {
                    self.stats.fired.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(bucket, index, error = %e, "Event callback failed");
                }
                Err(_) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(bucket, index, "Event callback panicked");
                }
            }
        }
    }
}

/// Handle to a running dispatcher
pub struct DispatcherHandle {
    stop: StopSignal,
    stats: Arc<DispatchStats>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal stop and wait for the loop to exit. Callbacks already running
    /// finish before this returns.
    pub async fn stop(self) -> DispatchSnapshot {
        self.stop.stop();
        if let Err(e) = self.task.await {
            error!(error = %e, "Dispatcher task failed");
        }
        self.stats.snapshot()
    }
}
