//! Consumers of replay steps

use dashmap::DashMap;

use super::{ReplayFrame, ReplayStep};

/// Receives the transform commands of each replay step.
///
/// Implementations must not block: frames are fire-and-forget animations.
pub trait TransformSink: Send + Sync {
    fn apply_step(&self, step: &ReplayStep);
}

/// Most recent frame per entity, for detail lookups
#[derive(Debug, Default)]
pub struct LatestFrames {
    frames: DashMap<u32, ReplayFrame>,
}

impl LatestFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: u32) -> Option<ReplayFrame> {
        self.frames.get(&entity_id).map(|f| *f.value())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl TransformSink for LatestFrames {
    fn apply_step(&self, step: &ReplayStep) {
        for frame in &step.frames {
            self.frames.insert(frame.entity_id, *frame);
        }
    }
}
