//! Time utilities for session replay

use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: OnceLock<std::time::Instant> = OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(std::time::Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Dispatcher cadence
pub const DISPATCH_TPS: u32 = 1; // 1 tick per second
pub const DISPATCH_INTERVAL: Duration = Duration::from_micros(1_000_000 / DISPATCH_TPS as u64);

/// Clock lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// `start()` has not been called yet
    Stopped,
    /// Measuring elapsed time since the start instant
    Running,
}

/// Simulated session clock.
///
/// Elapsed time is measured against the tokio clock, so paused-time tests can
/// drive it with `tokio::time::advance`. Clones share the same start instant.
#[derive(Debug, Clone, Default)]
pub struct SimulationClock {
    started_at: Arc<OnceLock<Instant>>,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock. Calling it again keeps the first start instant.
    pub fn start(&self) -> Instant {
        *self.started_at.get_or_init(Instant::now)
    }

    pub fn state(&self) -> ClockState {
        if self.started_at.get().is_some() {
            ClockState::Running
        } else {
            ClockState::Stopped
        }
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at.get().copied()
    }

    /// Seconds since `start()`. Returns 0.0 while the clock is stopped.
    pub fn elapsed(&self) -> f64 {
        self.started_at
            .get()
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Current time bucket (whole elapsed seconds)
    pub fn bucket(&self) -> u64 {
        self.elapsed().floor() as u64
    }
}

/// Format elapsed seconds as `HH:MM:SS.mmm` track time
pub fn format_elapsed(elapsed_secs: f64) -> String {
    let elapsed_secs = if elapsed_secs.is_finite() {
        elapsed_secs.max(0.0)
    } else {
        0.0
    };
    let whole = elapsed_secs.floor() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = whole % 60;
    let millis = ((elapsed_secs - whole as f64) * 1000.0) as u64;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis.min(999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_track_time() {
        assert_eq!(format_elapsed(0.0), "00:00:00.000");
        assert_eq!(format_elapsed(3723.25), "01:02:03.250");
        assert_eq!(format_elapsed(-4.0), "00:00:00.000");
        assert_eq!(format_elapsed(f64::NAN), "00:00:00.000");
    }

    #[test]
    fn stopped_clock_reads_zero() {
        let clock = SimulationClock::new();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.bucket(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_tokio_time() {
        let clock = SimulationClock::new();
        let first = clock.start();
        tokio::time::advance(Duration::from_millis(2500)).await;

        assert_eq!(clock.state(), ClockState::Running);
        assert_eq!(clock.bucket(), 2);
        assert!((clock.elapsed() - 2.5).abs() < 1e-9);

        // restarting keeps the original instant
        assert_eq!(clock.start(), first);
        let shared = clock.clone();
        assert_eq!(shared.started_at(), Some(first));
    }
}
