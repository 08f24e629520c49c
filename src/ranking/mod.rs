//! Standings: ranked entries, overtake replay and lap timing

pub mod board;
pub mod processor;
pub mod timing;

pub use board::{default_grid, DrsState, RankedEntry, RankingBoard, RankingError, StandingRow};
pub use processor::{AppliedOvertake, OvertakeRecord, RankingProcessor};
pub use timing::{timing_schedule, DriverLaps, LapRecord, ScheduledTiming, TimingUpdate};

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::schedule::{EventRegistry, Registration, TimeBucket};
use crate::ws::feed::SessionFeed;
use crate::ws::protocol::FeedMsg;

/// Shared standings, mutated by dispatcher callbacks and read by the HTTP layer
#[derive(Clone)]
pub struct Standings {
    board: Arc<Mutex<RankingBoard>>,
    overtakes: Arc<Mutex<RankingProcessor>>,
    feed: SessionFeed,
}

impl Standings {
    pub fn new(board: RankingBoard, overtakes: RankingProcessor, feed: SessionFeed) -> Self {
        Self {
            board: Arc::new(Mutex::new(board)),
            overtakes: Arc::new(Mutex::new(overtakes)),
            feed,
        }
    }

    /// Register one callback per distinct overtake bucket. Each callback
    /// advances the overtake cursor up to its bucket.
    pub fn schedule_overtakes(&self, registry: &EventRegistry) -> usize {
        let buckets = self.overtakes.lock().due_buckets();
        let mut queued = 0;

        for bucket in buckets {
            let standings = self.clone();
            let registration = registry.register(bucket, move || {
                standings.advance_to(bucket);
                Ok(())
            });
            if registration == Registration::Queued {
                queued += 1;
            }
        }

        debug!(buckets = queued, "Overtakes scheduled");
        queued
    }

    /// Apply every overtake due by `bucket` and publish each swap
    pub fn advance_to(&self, bucket: TimeBucket) -> usize {
        let applied = {
            let mut board = self.board.lock();
            self.overtakes.lock().advance_to(bucket, &mut board)
        };
        let count = applied.len();

        for overtake in applied {
            self.feed.publish(FeedMsg::Overtake {
                overtaker: overtake.overtaker,
                overtaken: overtake.overtaken,
                position: overtake.position,
                order: overtake.order,
            });
        }
        count
    }

    /// Register the sector and lap updates of every recorded lap
    pub fn schedule_timing(&self, registry: &EventRegistry, laps: &[DriverLaps]) -> usize {
        let mut queued = 0;

        for scheduled in timing_schedule(laps) {
            let standings = self.clone();
            let registration = registry.register(scheduled.bucket, move || {
                standings.apply_timing(scheduled.driver_number, scheduled.update)
            });
            if registration == Registration::Queued {
                queued += 1;
            }
        }

        debug!(updates = queued, "Lap timing scheduled");
        queued
    }

    /// Update one driver's timing fields. An unknown driver is skipped.
    pub fn apply_timing(&self, driver_number: u32, update: TimingUpdate) -> anyhow::Result<()> {
        {
            let mut board = self.board.lock();
            let Some(entry) = board.get_mut(driver_number) else {
                warn!(driver_number, "Timing update for unknown driver");
                return Ok(());
            };
            update.apply(entry);
        }

        self.feed.publish(FeedMsg::LapUpdate {
            driver_number,
            update,
        });
        Ok(())
    }

    pub fn rows(&self) -> Vec<StandingRow> {
        self.board.lock().rows()
    }

    pub fn row(&self, driver_number: u32) -> Option<StandingRow> {
        self.board.lock().row(driver_number)
    }

    pub fn order(&self) -> Vec<u32> {
        self.board.lock().order()
    }

    /// (applied-or-skipped cursor, skipped, remaining)
    pub fn overtake_progress(&self) -> (usize, usize, usize) {
        let overtakes = self.overtakes.lock();
        (overtakes.cursor(), overtakes.skipped(), overtakes.remaining())
    }
}
