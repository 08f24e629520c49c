//! Loads a recorded session directory

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::narrative::NarrativeEvent;
use crate::ranking::{DriverLaps, OvertakeRecord, RankedEntry};
use crate::replay::EntityTrack;

use super::car::CarTelemetry;
use super::records::{RawCarData, RawDriver, RawLaps, RawOvertake, RawTrack};

pub const EVENTS_FILE: &str = "events.json";
pub const LOCATIONS_FILE: &str = "locations.json";
pub const OVERTAKES_FILE: &str = "overtakes.json";
pub const LAPS_FILE: &str = "laps.json";
pub const DRIVERS_FILE: &str = "drivers.json";
pub const CAR_DATA_FILE: &str = "car_data.json";

/// Telemetry loading errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a session replays
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub tracks: Vec<EntityTrack>,
    pub events: Vec<NarrativeEvent>,
    pub overtakes: Vec<OvertakeRecord>,
    pub laps: Vec<DriverLaps>,
    pub car: CarTelemetry,
    /// `None` when the directory has no roster file
    pub roster: Option<Vec<RankedEntry>>,
}

/// A directory of JSON session files
#[derive(Debug, Clone)]
pub struct JsonSessionDir {
    root: PathBuf,
}

impl JsonSessionDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read all session files concurrently. A missing or malformed file
    /// yields an empty collection and a warning.
    pub async fn load(&self) -> SessionData {
        let (tracks, events, overtakes, laps, car, roster) = tokio::join!(
            self.read_list::<RawTrack>(LOCATIONS_FILE),
            self.read_list::<NarrativeEvent>(EVENTS_FILE),
            self.read_list::<RawOvertake>(OVERTAKES_FILE),
            self.read_list::<RawLaps>(LAPS_FILE),
            self.read_list::<RawCarData>(CAR_DATA_FILE),
            self.read_roster(),
        );

        let data = SessionData {
            tracks: tracks.into_iter().map(RawTrack::into_track).collect(),
            events,
            overtakes: overtakes
                .into_iter()
                .filter_map(RawOvertake::into_record)
                .collect(),
            laps: laps.into_iter().map(RawLaps::into_driver_laps).collect(),
            car: CarTelemetry::new(car.into_iter().map(RawCarData::into_trace)),
            roster,
        };

        info!(
            dir = %self.root.display(),
            tracks = data.tracks.len(),
            events = data.events.len(),
            overtakes = data.overtakes.len(),
            laps = data.laps.len(),
            car = data.car.drivers(),
            roster = data.roster.as_ref().map_or(0, Vec::len),
            "Session data loaded"
        );
        data
    }

    async fn read_list<T>(&self, name: &str) -> Vec<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match read_json::<Vec<T>>(self.root.join(name)).await {
            Ok(items) => items,
            Err(e) => {
                warn!(file = name, error = %e, "Session file unavailable, using empty set");
                Vec::new()
            }
        }
    }

    async fn read_roster(&self) -> Option<Vec<RankedEntry>> {
        let path = self.root.join(DRIVERS_FILE);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }

        match read_json::<Vec<RawDriver>>(path).await {
            Ok(drivers) if !drivers.is_empty() => {
                Some(drivers.into_iter().map(RawDriver::into_entry).collect())
            }
            Ok(_) => {
                warn!(file = DRIVERS_FILE, "Roster is empty, using default grid");
                None
            }
            Err(e) => {
                warn!(file = DRIVERS_FILE, error = %e, "Roster unreadable, using default grid");
                None
            }
        }
    }
}

/// Read and parse one file on the blocking pool
pub async fn read_json<T>(path: PathBuf) -> Result<T, TelemetryError>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|source| TelemetryError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| TelemetryError::Json { path, source })
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pitwall-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn loads_every_file() {
        let dir = scratch_dir();
        std::fs::write(
            dir.join(EVENTS_FILE),
            r#"[{"type":"Radio","time":4.2,"message":"Box box"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(LOCATIONS_FILE),
            r#"[{"id":1,"positions":[[0,0,0,0],[10,10,0,0.5]]}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(OVERTAKES_FILE),
            r#"[{"time":10,"overtaken":"7","overtaker":"3"},{"time":11,"overtaken":"x","overtaker":"3"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(LAPS_FILE),
            r#"[{"id":1,"positions":[[1,30,30,30,90,0]]}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(CAR_DATA_FILE),
            r#"[{"id":3,"positions":[[0.5,10000,280,7,100,8,0],[1.5,10500,290,7,100,8,0]]}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(DRIVERS_FILE),
            r#"[{"number":3,"code":"RIC","team":"RB"},{"number":7,"code":"ABC","team":"X"}]"#,
        )
        .unwrap();

        let data = JsonSessionDir::new(&dir).load().await;

        assert_eq!(data.events.len(), 1);
        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].samples.len(), 2);
        assert_eq!(data.overtakes.len(), 1);
        assert_eq!(data.laps[0].laps.len(), 1);
        assert_eq!(data.roster.as_ref().map(Vec::len), Some(2));
        assert_eq!(data.car.latest_at(3, 1.0).map(|s| s.speed), Some(280.0));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_and_malformed_files_degrade_to_empty() {
        let dir = scratch_dir();
        std::fs::write(dir.join(EVENTS_FILE), "{ not json").unwrap();
        std::fs::write(dir.join(CAR_DATA_FILE), r#"[{"id":"forty-four"}]"#).unwrap();

        let data = JsonSessionDir::new(&dir).load().await;

        assert!(data.events.is_empty());
        assert!(data.tracks.is_empty());
        assert!(data.overtakes.is_empty());
        assert!(data.laps.is_empty());
        assert!(data.car.is_empty());
        assert!(data.roster.is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn read_json_reports_the_path() {
        let path = std::env::temp_dir().join(format!("pitwall-missing-{}.json", Uuid::new_v4()));
        let err = read_json::<Vec<u32>>(path.clone()).await.unwrap_err();
        match err {
            TelemetryError::Io { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
