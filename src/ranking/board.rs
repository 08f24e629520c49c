//! Ranked standings list

use serde::{Deserialize, Serialize};

/// Placeholder shown for timing fields with no data yet
pub const EMPTY_TIME: &str = "00.000";

/// DRS / pit indicator shown next to a driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrsState {
    /// DRS available
    Enabled,
    /// DRS not available
    Disabled,
    /// DRS open
    On,
    /// DRS closed
    Off,
    /// Driver in the pit lane
    Pit,
    #[default]
    Unknown,
}

/// One driver's row in the standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub driver_number: u32,
    /// Three-letter driver code
    pub code: String,
    pub team: String,
    /// Tyre compound letter (S, M, H, I, W)
    pub tyre: String,
    pub drs: DrsState,
    pub tyre_laps: u32,
    pub fastest_lap: String,
    /// Last completed lap time
    pub current_lap: String,
    /// Sector 1 and 2 splits of the lap in progress
    pub sectors: [String; 2],
    pub lap_number: u32,
}

impl RankedEntry {
    pub fn new(driver_number: u32, code: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            driver_number,
            code: code.into(),
            team: team.into(),
            tyre: "M".to_string(),
            drs: DrsState::Unknown,
            tyre_laps: 0,
            fastest_lap: EMPTY_TIME.to_string(),
            current_lap: EMPTY_TIME.to_string(),
            sectors: [EMPTY_TIME.to_string(), EMPTY_TIME.to_string()],
            lap_number: 0,
        }
    }

    pub fn with_tyre(mut self, tyre: impl Into<String>, drs: DrsState) -> Self {
        self.tyre = tyre.into();
        self.drs = drs;
        self
    }
}

/// A standings row with its 1-based position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub position: usize,
    pub entry: RankedEntry,
}

/// Ranking errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("Unknown driver: {0}")]
    UnknownDriver(u32),
}

/// Ordered standings. Entries are only ever swapped, never inserted or removed.
#[derive(Debug, Clone, Default)]
pub struct RankingBoard {
    entries: Vec<RankedEntry>,
}

impl RankingBoard {
    pub fn new(entries: Vec<RankedEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn index_of(&self, driver_number: u32) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.driver_number == driver_number)
    }

    pub fn get_mut(&mut self, driver_number: u32) -> Option<&mut RankedEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.driver_number == driver_number)
    }

    /// Swap two drivers' positions. Returns their new indices.
    pub fn swap(&mut self, first: u32, second: u32) -> Result<(usize, usize), RankingError> {
        let a = self
            .index_of(first)
            .ok_or(RankingError::UnknownDriver(first))?;
        let b = self
            .index_of(second)
            .ok_or(RankingError::UnknownDriver(second))?;
        self.entries.swap(a, b);
        Ok((b, a))
    }

    /// Driver numbers in standings order
    pub fn order(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.driver_number).collect()
    }

    pub fn rows(&self) -> Vec<StandingRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| StandingRow {
                position: i + 1,
                entry: entry.clone(),
            })
            .collect()
    }

    pub fn row(&self, driver_number: u32) -> Option<StandingRow> {
        self.index_of(driver_number).map(|i| StandingRow {
            position: i + 1,
            entry: self.entries[i].clone(),
        })
    }
}

/// Starting grid used when the session ships no roster
pub fn default_grid() -> Vec<RankedEntry> {
    use DrsState::*;

    [
        (1, "VER", "Red Bull Racing", "M", Disabled),
        (11, "PER", "Red Bull Racing", "S", Pit),
        (44, "HAM", "Mercedes", "H", On),
        (14, "ALO", "Aston Martin", "M", Off),
        (16, "LEC", "Ferrari", "I", Enabled),
        (4, "NOR", "McLaren", "W", Disabled),
        (55, "SAI", "Ferrari", "S", Pit),
        (63, "RUS", "Mercedes", "H", On),
        (81, "PIA", "McLaren", "M", Off),
        (18, "STR", "Aston Martin", "W", Enabled),
        (10, "GAS", "Alpine", "I", Disabled),
        (31, "OCO", "Alpine", "S", On),
        (23, "ALB", "Williams", "H", Pit),
        (22, "TSU", "RB", "M", Off),
        (77, "BOT", "Kick Sauber", "W", Enabled),
        (27, "HUL", "Haas F1 Team", "S", On),
        (3, "RIC", "RB", "H", Pit),
        (24, "ZHO", "Kick Sauber", "I", Disabled),
        (20, "MAG", "Haas F1 Team", "M", Enabled),
        (2, "SAR", "Williams", "S", On),
    ]
    .into_iter()
    .map(|(number, code, team, tyre, drs)| RankedEntry::new(number, code, team).with_tyre(tyre, drs))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(numbers: &[u32]) -> RankingBoard {
        RankingBoard::new(
            numbers
                .iter()
                .map(|&n| RankedEntry::new(n, format!("D{n}"), "Team"))
                .collect(),
        )
    }

    #[test]
    fn swap_exchanges_exactly_two_entries() {
        let mut board = board(&[1, 7, 5, 3, 9]);
        assert_eq!(board.swap(3, 7), Ok((1, 3)));
        assert_eq!(board.order(), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn swap_with_unknown_driver_leaves_board_untouched() {
        let mut board = board(&[1, 2, 3]);
        assert_eq!(board.swap(2, 42), Err(RankingError::UnknownDriver(42)));
        assert_eq!(board.swap(42, 2), Err(RankingError::UnknownDriver(42)));
        assert_eq!(board.order(), vec![1, 2, 3]);
    }

    #[test]
    fn rows_are_one_based() {
        let board = board(&[44, 1]);
        let rows = board.rows();
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[1].entry.driver_number, 1);
        assert_eq!(board.row(1).map(|r| r.position), Some(2));
        assert!(board.row(5).is_none());
    }

    #[test]
    fn default_grid_has_unique_numbers() {
        let grid = default_grid();
        let mut numbers: Vec<u32> = grid.iter().map(|e| e.driver_number).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), grid.len());
    }
}
