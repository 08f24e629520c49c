//! Cooperative stop signal shared by the dispatcher and replay tasks

use std::sync::Arc;

use tokio::sync::watch;

/// Once stopped, stays stopped.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `stop()` has been called on any clone
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns on stop
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn stop_wakes_waiters() {
        let signal = StopSignal::new();
        let waiter = signal.clone();
        let mut stopped = task::spawn(async move { waiter.stopped().await });

        assert_pending!(stopped.poll());
        signal.stop();
        assert!(stopped.is_woken());
        assert_ready!(stopped.poll());
        assert!(signal.is_stopped());
    }
}
