//! Pending callbacks keyed by time bucket

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::warn;

use super::TimeBucket;

/// A scheduled callback. Errors are reported by the dispatcher, never propagated.
pub type EventCallback = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Outcome of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Will fire when the dispatcher reaches the bucket
    Queued,
    /// The bucket was already taken; the callback was dropped and will never fire
    Missed,
}

#[derive(Default)]
struct RegistryInner {
    pending: HashMap<TimeBucket, Vec<EventCallback>>,
    /// Highest bucket handed to the dispatcher so far
    taken_through: Option<TimeBucket>,
}

/// Bucket -> ordered callback list, behind a single lock.
///
/// The lock also covers the taken watermark, so a registration racing with
/// `take` for the same bucket either lands before the take (and fires) or is
/// reported as [`Registration::Missed`].
#[derive(Default)]
pub struct EventRegistry {
    inner: Mutex<RegistryInner>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to `bucket`, preserving registration order
    pub fn register<F>(&self, bucket: TimeBucket, callback: F) -> Registration
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let mut inner = self.inner.lock();

        if let Some(taken) = inner.taken_through.filter(|taken| bucket <= *taken) {
            drop(inner);
            warn!(bucket, taken_through = taken, "Bucket already dispatched, callback dropped");
            return Registration::Missed;
        }

        inner
            .pending
            .entry(bucket)
            .or_default()
            .push(Box::new(callback));
        Registration::Queued
    }

    /// Remove and return every callback for `bucket`, in registration order.
    ///
    /// Closes `bucket` and every earlier bucket for further registration.
    pub fn take(&self, bucket: TimeBucket) -> Vec<EventCallback> {
        let mut inner = self.inner.lock();
        inner.taken_through = Some(inner.taken_through.map_or(bucket, |t| t.max(bucket)));
        inner.pending.remove(&bucket).unwrap_or_default()
    }

    pub fn taken_through(&self) -> Option<TimeBucket> {
        self.inner.lock().taken_through
    }

    pub fn pending_buckets(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn pending_callbacks(&self) -> usize {
        self.inner.lock().pending.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> EventCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| -> EventCallback {
            let sink = sink.clone();
            Box::new(move || {
                sink.lock().push(name);
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn take_returns_callbacks_in_registration_order() {
        let registry = EventRegistry::new();
        let (log, make) = recorder();

        for name in ["a", "b", "c"] {
            assert_eq!(registry.register(3, make(name)), Registration::Queued);
        }
        registry.register(4, make("other"));

        for callback in registry.take(3) {
            callback().unwrap();
        }

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(registry.pending_buckets(), 1);
        assert_eq!(registry.pending_callbacks(), 1);
    }

    #[test]
    fn bucket_is_taken_once() {
        let registry = EventRegistry::new();
        let (_log, make) = recorder();
        registry.register(1, make("x"));

        assert_eq!(registry.take(1).len(), 1);
        assert!(registry.take(1).is_empty());
        assert!(registry.take(7).is_empty());
        assert_eq!(registry.taken_through(), Some(7));
    }

    #[test]
    fn late_registration_is_reported_and_dropped() {
        let registry = EventRegistry::new();
        let (log, make) = recorder();

        registry.take(0);
        registry.take(1);
        registry.take(2);

        assert_eq!(registry.register(2, make("late")), Registration::Missed);
        assert_eq!(registry.register(0, make("later")), Registration::Missed);
        assert_eq!(registry.register(3, make("on time")), Registration::Queued);

        for callback in registry.take(2) {
            callback().unwrap();
        }
        assert!(log.lock().is_empty());
        assert_eq!(registry.pending_callbacks(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_loses_nothing() {
        let registry = Arc::new(EventRegistry::new());

        let tasks: Vec<_> = (0..64u64)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for _ in 0..10 {
                        registry.register(i % 8, || Ok(()));
                    }
                })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(registry.pending_buckets(), 8);
        assert_eq!(registry.pending_callbacks(), 640);
        let total: usize = (0..8).map(|bucket| registry.take(bucket).len()).sum();
        assert_eq!(total, 640);
    }
}
