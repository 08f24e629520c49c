//! Lap and sector timing updates for the standings

use serde::{Deserialize, Serialize};

use crate::schedule::{bucket_for, TimeBucket};

use super::board::{RankedEntry, EMPTY_TIME};

/// One completed lap as recorded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    pub sector1: f64,
    pub sector2: f64,
    pub sector3: f64,
    pub lap_duration: f64,
    /// Lap start, seconds from session start
    pub start: f64,
}

/// Every recorded lap of one driver
#[derive(Debug, Clone, PartialEq)]
pub struct DriverLaps {
    pub driver_number: u32,
    pub laps: Vec<LapRecord>,
}

/// A timing change shown on a driver's row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimingUpdate {
    Sector1 { split: f64 },
    Sector2 { split: f64 },
    LapComplete { lap_number: u32, lap_time: f64 },
}

impl TimingUpdate {
    pub fn apply(&self, entry: &mut RankedEntry) {
        match *self {
            TimingUpdate::Sector1 { split } => {
                entry.sectors[0] = format_split(split);
            }
            TimingUpdate::Sector2 { split } => {
                entry.sectors[1] = format_split(split);
            }
            TimingUpdate::LapComplete { lap_number, lap_time } => {
                entry.sectors = [EMPTY_TIME.to_string(), EMPTY_TIME.to_string()];
                entry.current_lap = format_split(lap_time);
                if lap_number > entry.lap_number {
                    entry.tyre_laps += lap_number - entry.lap_number;
                }
                entry.lap_number = lap_number;

                let best = entry.fastest_lap.parse::<f64>().ok().filter(|b| *b > 0.0);
                if lap_time > 0.0 && best.map_or(true, |b| lap_time < b) {
                    entry.fastest_lap = format_split(lap_time);
                }
            }
        }
    }
}

/// A timing update due at `bucket` for `driver_number`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTiming {
    pub bucket: TimeBucket,
    pub driver_number: u32,
    pub update: TimingUpdate,
}

/// Expand recorded laps into the updates to schedule, in recorded order.
/// Sector 1 lands at `start + s1`, sector 2 at `start + s1 + s2`, and the lap
/// closes at `start + lap_duration`. Updates with no valid time are dropped.
pub fn timing_schedule(drivers: &[DriverLaps]) -> Vec<ScheduledTiming> {
    let mut scheduled = Vec::new();

    for driver in drivers {
        for lap in &driver.laps {
            let sector1_at = lap.start + lap.sector1;
            let sector2_at = sector1_at + lap.sector2;
            let lap_at = lap.start + lap.lap_duration;

            let updates = [
                (sector1_at, TimingUpdate::Sector1 { split: lap.sector1 }),
                (sector2_at, TimingUpdate::Sector2 { split: lap.sector2 }),
                (
                    lap_at,
                    TimingUpdate::LapComplete {
                        lap_number: lap.lap_number,
                        lap_time: lap.lap_duration,
                    },
                ),
            ];

            scheduled.extend(updates.into_iter().filter_map(|(at, update)| {
                bucket_for(at).map(|bucket| ScheduledTiming {
                    bucket,
                    driver_number: driver.driver_number,
                    update,
                })
            }));
        }
    }

    scheduled
}

fn format_split(seconds: f64) -> String {
    format!("{:06.3}", seconds.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(lap_number: u32, start: f64) -> LapRecord {
        LapRecord {
            lap_number,
            sector1: 30.5,
            sector2: 40.25,
            sector3: 25.0,
            lap_duration: 95.75,
            start,
        }
    }

    #[test]
    fn laps_expand_to_three_updates() {
        let schedule = timing_schedule(&[DriverLaps {
            driver_number: 44,
            laps: vec![lap(1, 100.0)],
        }]);

        let buckets: Vec<TimeBucket> = schedule.iter().map(|s| s.bucket).collect();
        assert_eq!(buckets, vec![130, 170, 195]);
        assert!(schedule.iter().all(|s| s.driver_number == 44));
        assert_eq!(
            schedule[2].update,
            TimingUpdate::LapComplete {
                lap_number: 1,
                lap_time: 95.75
            }
        );
    }

    #[test]
    fn negative_times_are_dropped() {
        let schedule = timing_schedule(&[DriverLaps {
            driver_number: 1,
            laps: vec![LapRecord {
                lap_number: 1,
                sector1: 10.0,
                sector2: 10.0,
                sector3: 10.0,
                lap_duration: 30.0,
                start: -25.0,
            }],
        }]);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].bucket, 5);
    }

    #[test]
    fn updates_fill_and_reset_row() {
        let mut entry = RankedEntry::new(16, "LEC", "Ferrari");

        TimingUpdate::Sector1 { split: 30.5 }.apply(&mut entry);
        TimingUpdate::Sector2 { split: 9.25 }.apply(&mut entry);
        assert_eq!(entry.sectors, ["30.500".to_string(), "09.250".to_string()]);

        TimingUpdate::LapComplete {
            lap_number: 3,
            lap_time: 95.75,
        }
        .apply(&mut entry);
        assert_eq!(entry.sectors, [EMPTY_TIME.to_string(), EMPTY_TIME.to_string()]);
        assert_eq!(entry.current_lap, "95.750");
        assert_eq!(entry.fastest_lap, "95.750");
        assert_eq!(entry.lap_number, 3);
        assert_eq!(entry.tyre_laps, 3);

        TimingUpdate::LapComplete {
            lap_number: 4,
            lap_time: 97.0,
        }
        .apply(&mut entry);
        assert_eq!(entry.current_lap, "97.000");
        assert_eq!(entry.fastest_lap, "95.750");
    }
}
