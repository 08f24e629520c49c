//! Session feed fan-out

use tokio::sync::broadcast;

use crate::replay::{ReplayStep, TransformSink};

use super::protocol::FeedMsg;

/// Broadcast channel carrying everything the session emits
#[derive(Debug, Clone)]
pub struct SessionFeed {
    tx: broadcast::Sender<FeedMsg>,
}

impl SessionFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Dropped when nobody listens.
    pub fn publish(&self, msg: FeedMsg) {
        let _ = self.tx.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedMsg> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl TransformSink for SessionFeed {
    fn apply_step(&self, step: &ReplayStep) {
        self.publish(FeedMsg::Replay { step: step.clone() });
    }
}
