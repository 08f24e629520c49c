//! Per-car telemetry: speed, rpm, gear, pedals and DRS over time

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One car telemetry reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarSample {
    /// Seconds from session start
    pub timestamp: f64,
    pub rpm: u32,
    /// km/h
    pub speed: f64,
    pub n_gear: u8,
    /// Percent
    pub throttle: f64,
    /// Raw DRS status code
    pub drs: u8,
    /// Percent
    pub brake: f64,
}

/// Car telemetry for every driver, ordered by time
#[derive(Debug, Clone, Default)]
pub struct CarTelemetry {
    samples: HashMap<u32, Vec<CarSample>>,
}

impl CarTelemetry {
    pub fn new(traces: impl IntoIterator<Item = (u32, Vec<CarSample>)>) -> Self {
        let mut samples: HashMap<u32, Vec<CarSample>> = HashMap::new();
        for (driver_number, trace) in traces {
            samples.entry(driver_number).or_default().extend(trace);
        }
        for trace in samples.values_mut() {
            trace.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        }
        Self { samples }
    }

    pub fn drivers(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Latest reading at or before `elapsed`
    pub fn latest_at(&self, driver_number: u32, elapsed: f64) -> Option<CarSample> {
        let trace = self.samples.get(&driver_number)?;
        let idx = trace.partition_point(|s| s.timestamp <= elapsed);
        idx.checked_sub(1).map(|i| trace[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: f64, speed: f64) -> CarSample {
        CarSample {
            timestamp,
            rpm: 11_000,
            speed,
            n_gear: 7,
            throttle: 100.0,
            drs: 0,
            brake: 0.0,
        }
    }

    #[test]
    fn latest_reading_never_looks_ahead() {
        let telemetry = CarTelemetry::new([(
            44,
            vec![sample(2.0, 300.0), sample(-1.0, 80.0), sample(1.0, 250.0)],
        )]);

        assert_eq!(telemetry.latest_at(44, -2.0), None);
        assert_eq!(telemetry.latest_at(44, 0.0).map(|s| s.speed), Some(80.0));
        assert_eq!(telemetry.latest_at(44, 1.0).map(|s| s.speed), Some(250.0));
        assert_eq!(telemetry.latest_at(44, 1.9).map(|s| s.speed), Some(250.0));
        assert_eq!(telemetry.latest_at(44, 60.0).map(|s| s.speed), Some(300.0));
        assert_eq!(telemetry.latest_at(1, 60.0), None);
    }
}
