//! Telemetry-to-scene coordinate mapping and heading derivation

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use super::PositionSample;

/// Calibration constants tuned to the scene's scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayCalibration {
    /// Raw X -> scene X scale
    pub scale_x: f64,
    /// Raw Z -> scene Z scale
    pub scale_z: f64,
    /// Scene X translation
    pub offset_x: f64,
    /// Scene Z translation
    pub offset_z: f64,
    /// Model orientation correction in radians
    pub heading_offset: f64,
}

impl Default for ReplayCalibration {
    fn default() -> Self {
        Self {
            scale_x: 0.000_025,
            scale_z: 0.000_025,
            offset_x: 0.0,
            offset_z: 0.0,
            heading_offset: 1.0_f64.to_radians(),
        }
    }
}

impl ReplayCalibration {
    /// Map raw telemetry coordinates to scene coordinates.
    /// Both axes are mirrored.
    pub fn to_world(&self, raw_x: f64, raw_z: f64) -> (f64, f64) {
        (
            -raw_x * self.scale_x + self.offset_x,
            -raw_z * self.scale_z + self.offset_z,
        )
    }

    /// Heading for a move from `prev` to `cur`, or `None` when the entity did
    /// not move (the caller holds the previous heading).
    pub fn heading(&self, prev: &PositionSample, cur: &PositionSample) -> Option<f64> {
        let dx = cur.x - prev.x;
        let dz = cur.z - prev.z;
        if (dx == 0.0 && dz == 0.0) || !dx.is_finite() || !dz.is_finite() {
            return None;
        }
        Some(dz.atan2(dx) + FRAC_PI_2 + self.heading_offset)
    }
}

/// Shift `raw` by whole turns so it lies within half a turn of `prev`.
/// Keeps consecutive headings continuous across the atan2 branch cut.
pub fn unwrap_heading(prev: f64, raw: f64) -> f64 {
    let mut diff = (raw - prev).rem_euclid(TAU);
    if diff > PI {
        diff -= TAU;
    }
    prev + diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, z: f64) -> PositionSample {
        PositionSample {
            entity_id: 1,
            x,
            z,
            timestamp: 0.0,
        }
    }

    #[test]
    fn world_position_is_mirrored_and_scaled() {
        let calibration = ReplayCalibration {
            scale_x: 0.5,
            scale_z: 0.25,
            offset_x: 10.0,
            offset_z: -2.0,
            heading_offset: 0.0,
        };
        assert_eq!(calibration.to_world(4.0, 8.0), (8.0, -4.0));
    }

    #[test]
    fn heading_adds_quarter_turn_and_offset() {
        let calibration = ReplayCalibration {
            heading_offset: 0.01,
            ..ReplayCalibration::default()
        };
        let heading = calibration
            .heading(&sample(0.0, 0.0), &sample(1.0, 0.0))
            .unwrap();
        assert!((heading - (FRAC_PI_2 + 0.01)).abs() < 1e-12);

        let heading = calibration
            .heading(&sample(0.0, 0.0), &sample(0.0, 2.0))
            .unwrap();
        assert!((heading - (PI + 0.01)).abs() < 1e-12);
    }

    #[test]
    fn stationary_sample_has_no_heading() {
        let calibration = ReplayCalibration::default();
        assert_eq!(calibration.heading(&sample(3.0, 3.0), &sample(3.0, 3.0)), None);
    }

    #[test]
    fn unwrap_stays_within_half_turn() {
        let prev = PI - 0.05;
        let raw = -PI + 0.05;
        let unwrapped = unwrap_heading(prev, raw);
        assert!((unwrapped - (PI + 0.05)).abs() < 1e-12);
        assert!((unwrapped - prev).abs() < PI);

        assert!((unwrap_heading(0.2, 0.3) - 0.3).abs() < 1e-12);
    }
}
