//! Position replay: recorded samples -> per-step scene transforms

pub mod engine;
pub mod sink;
pub mod transform;

pub use engine::{drive, step_count, ReplayEngine};
pub use sink::{LatestFrames, TransformSink};
pub use transform::ReplayCalibration;

use serde::{Deserialize, Serialize};

/// Heading an entity has before its first move (model faces +Z)
pub const DEFAULT_HEADING: f64 = std::f64::consts::FRAC_PI_2;

/// One recorded position of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub entity_id: u32,
    pub x: f64,
    pub z: f64,
    /// Seconds from session start
    pub timestamp: f64,
}

/// Ordered samples for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTrack {
    pub entity_id: u32,
    pub default_heading: f64,
    pub samples: Vec<PositionSample>,
}

impl EntityTrack {
    pub fn new(entity_id: u32, samples: Vec<PositionSample>) -> Self {
        Self {
            entity_id,
            default_heading: DEFAULT_HEADING,
            samples,
        }
    }

    pub fn with_default_heading(mut self, heading: f64) -> Self {
        self.default_heading = heading;
        self
    }
}

/// Transform command for one entity at one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub entity_id: u32,
    /// Scene X
    pub x: f64,
    /// Scene Z
    pub z: f64,
    /// Heading in radians
    pub heading: f64,
    /// Animation duration in seconds
    pub duration: f64,
}

/// Every entity's frame for one shared step index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStep {
    pub index: usize,
    /// Seconds between the previous sample and this one
    pub delta: f64,
    pub frames: Vec<ReplayFrame>,
}
