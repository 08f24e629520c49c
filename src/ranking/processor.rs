//! Overtake replay over the standings

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::schedule::{bucket_for, TimeBucket};

use super::RankingBoard;

/// A recorded overtake, scheduled by session time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvertakeRecord {
    /// Seconds from session start
    pub time: f64,
    pub overtaker: u32,
    pub overtaken: u32,
}

impl OvertakeRecord {
    /// Bucket at which the record becomes due. Records before the session
    /// start are due immediately.
    pub fn bucket(&self) -> TimeBucket {
        bucket_for(self.time.max(0.0)).unwrap_or(TimeBucket::MAX)
    }
}

/// An overtake that was applied to the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOvertake {
    pub overtaker: u32,
    pub overtaken: u32,
    /// 1-based position of the overtaker after the swap
    pub position: usize,
    /// Standings order right after this swap
    pub order: Vec<u32>,
}

/// Walks the overtake list with a forward-only cursor
#[derive(Debug, Clone, Default)]
pub struct RankingProcessor {
    records: Vec<OvertakeRecord>,
    cursor: usize,
    skipped: usize,
}

impl RankingProcessor {
    /// `records` must already be in ascending time order
    pub fn new(records: Vec<OvertakeRecord>) -> Self {
        Self {
            records,
            cursor: 0,
            skipped: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn remaining(&self) -> usize {
        self.records.len() - self.cursor
    }

    /// Distinct buckets of the records not yet applied
    pub fn due_buckets(&self) -> BTreeSet<TimeBucket> {
        self.records[self.cursor..]
            .iter()
            .map(OvertakeRecord::bucket)
            .filter(|b| *b != TimeBucket::MAX)
            .collect()
    }

    /// Apply every record due at or before `bucket`, in order.
    ///
    /// A record naming an unknown driver is skipped and logged; the cursor
    /// still moves past it so it is never retried.
    pub fn advance_to(&mut self, bucket: TimeBucket, board: &mut RankingBoard) -> Vec<AppliedOvertake> {
        let mut applied = Vec::new();

        while let Some(record) = self.records.get(self.cursor).copied() {
            if record.bucket() > bucket {
                break;
            }
            self.cursor += 1;

            match board.swap(record.overtaker, record.overtaken) {
                Ok((position, _)) => {
                    debug!(
                        overtaker = record.overtaker,
                        overtaken = record.overtaken,
                        position = position + 1,
                        "Overtake applied"
                    );
                    applied.push(AppliedOvertake {
                        overtaker: record.overtaker,
                        overtaken: record.overtaken,
                        position: position + 1,
                        order: board.order(),
                    });
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!(time = record.time, error = %e, "Skipping overtake");
                }
            }
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankedEntry;

    fn board(numbers: &[u32]) -> RankingBoard {
        RankingBoard::new(
            numbers
                .iter()
                .map(|&n| RankedEntry::new(n, format!("D{n}"), "Team"))
                .collect(),
        )
    }

    fn overtake(time: f64, overtaker: u32, overtaken: u32) -> OvertakeRecord {
        OvertakeRecord {
            time,
            overtaker,
            overtaken,
        }
    }

    #[test]
    fn overtake_moves_overtaker_ahead() {
        let mut board = board(&[1, 7, 4, 3, 9]);
        let mut processor = RankingProcessor::new(vec![overtake(10.0, 3, 7)]);

        assert!(processor.advance_to(9, &mut board).is_empty());
        assert_eq!(processor.cursor(), 0);

        let applied = processor.advance_to(10, &mut board);
        assert_eq!(
            applied,
            vec![AppliedOvertake {
                overtaker: 3,
                overtaken: 7,
                position: 2,
                order: vec![1, 3, 4, 7, 9],
            }]
        );
        assert_eq!(board.order(), vec![1, 3, 4, 7, 9]);
        assert_eq!(processor.cursor(), 1);
    }

    #[test]
    fn cursor_only_moves_forward() {
        let mut board = board(&[1, 2, 3]);
        let mut processor =
            RankingProcessor::new(vec![overtake(1.0, 2, 1), overtake(2.5, 3, 1), overtake(8.0, 3, 2)]);

        processor.advance_to(2, &mut board);
        assert_eq!(processor.cursor(), 2);
        assert_eq!(board.order(), vec![2, 3, 1]);

        // revisiting an earlier bucket re-applies nothing
        assert!(processor.advance_to(1, &mut board).is_empty());
        assert_eq!(board.order(), vec![2, 3, 1]);
        assert_eq!(processor.due_buckets().into_iter().collect::<Vec<_>>(), vec![8]);

        processor.advance_to(100, &mut board);
        assert_eq!(processor.remaining(), 0);
        assert_eq!(board.order(), vec![3, 2, 1]);
    }

    #[test]
    fn unknown_driver_is_skipped_without_blocking() {
        let mut board = board(&[1, 2, 3]);
        let mut processor = RankingProcessor::new(vec![overtake(1.0, 99, 1), overtake(1.5, 3, 2)]);

        let applied = processor.advance_to(1, &mut board);
        assert_eq!(applied.len(), 1);
        assert_eq!(processor.skipped(), 1);
        assert_eq!(processor.cursor(), 2);
        assert_eq!(board.order(), vec![1, 3, 2]);
    }

    #[test]
    fn records_before_start_are_due_at_zero() {
        let record = overtake(-3.0, 1, 2);
        assert_eq!(record.bucket(), 0);
        assert_eq!(overtake(59.9, 1, 2).bucket(), 59);
    }
}
