//! Recorded session file shapes and their conversion into core types

use serde::Deserialize;
use tracing::warn;

use crate::ranking::{DriverLaps, LapRecord, OvertakeRecord, RankedEntry};
use crate::replay::{EntityTrack, PositionSample};

use super::car::CarSample;

/// `locations.json` entry: samples are `[rawZ, rawX, unused, timestamp]`
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrack {
    pub id: u32,
    #[serde(default)]
    pub positions: Vec<Vec<Option<f64>>>,
}

/// `overtakes.json` entry; driver numbers arrive as strings
#[derive(Debug, Clone, Deserialize)]
pub struct RawOvertake {
    pub time: f64,
    pub overtaken: String,
    pub overtaker: String,
}

/// `laps.json` entry: laps are `[lap, s1, s2, s3, lap_duration, start]`
#[derive(Debug, Clone, Deserialize)]
pub struct RawLaps {
    pub id: u32,
    #[serde(default)]
    pub positions: Vec<Vec<Option<f64>>>,
}

/// `car_data.json` entry: readings are
/// `[timestamp, rpm, speed, n_gear, throttle, drs, brake]`
#[derive(Debug, Clone, Deserialize)]
pub struct RawCarData {
    pub id: u32,
    #[serde(default)]
    pub positions: Vec<Vec<Option<f64>>>,
}

/// `drivers.json` entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawDriver {
    pub number: u32,
    pub code: String,
    pub team: String,
    #[serde(default)]
    pub tyre: Option<String>,
}

impl RawTrack {
    /// Samples missing a coordinate or timestamp are dropped
    pub fn into_track(self) -> EntityTrack {
        let id = self.id;
        let total = self.positions.len();
        let samples: Vec<PositionSample> = self
            .positions
            .into_iter()
            .filter_map(|p| {
                let raw_z = (*p.first()?)?;
                let raw_x = (*p.get(1)?)?;
                let timestamp = (*p.get(3)?)?;
                Some(PositionSample {
                    entity_id: id,
                    x: raw_x,
                    z: raw_z,
                    timestamp,
                })
            })
            .collect();

        if samples.len() < total {
            warn!(
                entity_id = id,
                dropped = total - samples.len(),
                "Dropped incomplete position samples"
            );
        }
        EntityTrack::new(id, samples)
    }
}

impl RawOvertake {
    /// `None` when either driver number does not parse
    pub fn into_record(self) -> Option<OvertakeRecord> {
        let overtaker = self.overtaker.trim().parse().ok();
        let overtaken = self.overtaken.trim().parse().ok();
        match (overtaker, overtaken) {
            (Some(overtaker), Some(overtaken)) => Some(OvertakeRecord {
                time: self.time,
                overtaker,
                overtaken,
            }),
            _ => {
                warn!(
                    time = self.time,
                    overtaker = %self.overtaker,
                    overtaken = %self.overtaken,
                    "Unparseable overtake record"
                );
                None
            }
        }
    }
}

impl RawLaps {
    /// Missing values count as zero; rows shorter than six values are dropped
    pub fn into_driver_laps(self) -> DriverLaps {
        let laps = self
            .positions
            .into_iter()
            .filter(|lap| lap.len() >= 6)
            .map(|lap| {
                let value = |i: usize| lap[i].unwrap_or(0.0);
                LapRecord {
                    lap_number: value(0).max(0.0) as u32,
                    sector1: value(1),
                    sector2: value(2),
                    sector3: value(3),
                    lap_duration: value(4),
                    start: value(5),
                }
            })
            .collect();

        DriverLaps {
            driver_number: self.id,
            laps,
        }
    }
}

impl RawCarData {
    /// Readings without a timestamp are dropped; other missing values count as zero
    pub fn into_trace(self) -> (u32, Vec<CarSample>) {
        let samples = self
            .positions
            .into_iter()
            .filter_map(|row| {
                let timestamp = (*row.first()?)?;
                let value = |i: usize| row.get(i).copied().flatten().unwrap_or(0.0);
                Some(CarSample {
                    timestamp,
                    rpm: value(1).max(0.0) as u32,
                    speed: value(2),
                    n_gear: value(3).clamp(0.0, u8::MAX as f64) as u8,
                    throttle: value(4),
                    drs: value(5).clamp(0.0, u8::MAX as f64) as u8,
                    brake: value(6),
                })
            })
            .collect();
        (self.id, samples)
    }
}

impl RawDriver {
    pub fn into_entry(self) -> RankedEntry {
        let entry = RankedEntry::new(self.number, self.code, self.team);
        match self.tyre {
            Some(tyre) => {
                let drs = entry.drs;
                entry.with_tyre(tyre, drs)
            }
            None => entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_reads_z_then_x_then_timestamp() {
        let raw: RawTrack = serde_json::from_str(
            r#"{"id":44,"positions":[[10.0,20.0,0.0,0.5],[11.0,null,0.0,1.0],[12.0,22.0]]}"#,
        )
        .unwrap();
        let track = raw.into_track();

        assert_eq!(track.entity_id, 44);
        assert_eq!(track.samples.len(), 1);
        assert_eq!(track.samples[0].z, 10.0);
        assert_eq!(track.samples[0].x, 20.0);
        assert_eq!(track.samples[0].timestamp, 0.5);
    }

    #[test]
    fn overtake_ids_must_parse() {
        let good = RawOvertake {
            time: 10.0,
            overtaken: "7".to_string(),
            overtaker: " 3".to_string(),
        };
        assert_eq!(
            good.into_record(),
            Some(OvertakeRecord {
                time: 10.0,
                overtaker: 3,
                overtaken: 7
            })
        );

        let bad = RawOvertake {
            time: 11.0,
            overtaken: "7".to_string(),
            overtaker: "VER".to_string(),
        };
        assert_eq!(bad.into_record(), None);
    }

    #[test]
    fn car_readings_keep_column_order() {
        let raw: RawCarData = serde_json::from_str(
            r#"{"id":16,"positions":[[12.5,11141,315,8,99,12,0],[null,1,2,3,4,5,6],[13.0,10500,null]]}"#,
        )
        .unwrap();
        let (driver_number, samples) = raw.into_trace();

        assert_eq!(driver_number, 16);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].rpm, 11141);
        assert_eq!(samples[0].speed, 315.0);
        assert_eq!(samples[0].n_gear, 8);
        assert_eq!(samples[0].drs, 12);
        assert_eq!(samples[1].speed, 0.0);
        assert_eq!(samples[1].brake, 0.0);
    }

    #[test]
    fn lap_nulls_count_as_zero() {
        let raw: RawLaps = serde_json::from_str(
            r#"{"id":1,"positions":[[2,30.1,null,25.0,90.5,120.0],[3,1.0]]}"#,
        )
        .unwrap();
        let laps = raw.into_driver_laps();

        assert_eq!(laps.laps.len(), 1);
        assert_eq!(laps.laps[0].lap_number, 2);
        assert_eq!(laps.laps[0].sector2, 0.0);
        assert_eq!(laps.laps[0].start, 120.0);
    }
}
