//! Time-bucketed callback scheduling

pub mod dispatcher;
pub mod registry;
pub mod stop;

pub use dispatcher::{DispatchSnapshot, DispatchStats, Dispatcher, DispatcherHandle};
pub use registry::{EventCallback, EventRegistry, Registration};
pub use stop::StopSignal;

/// Whole elapsed simulated seconds
pub type TimeBucket = u64;

/// Bucket for a recorded time offset. Negative or non-finite offsets have none.
pub fn bucket_for(seconds: f64) -> Option<TimeBucket> {
    if seconds.is_finite() && seconds >= 0.0 {
        Some(seconds.floor() as TimeBucket)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_floor_offsets() {
        assert_eq!(bucket_for(0.0), Some(0));
        assert_eq!(bucket_for(4.999), Some(4));
        assert_eq!(bucket_for(5.0), Some(5));
        assert_eq!(bucket_for(-0.1), None);
        assert_eq!(bucket_for(f64::INFINITY), None);
    }
}
