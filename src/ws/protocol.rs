//! Feed protocol message definitions
//! These are the wire types between the replay core and presentation clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::narrative::EventKind;
use crate::ranking::{StandingRow, TimingUpdate};
use crate::replay::{ReplayFrame, ReplayStep};
use crate::telemetry::CarSample;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Request the detail view of one driver
    SelectDriver { driver_number: u32 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        server_time: u64,
        /// Session elapsed seconds at connect time
        elapsed: f64,
    },

    /// Session clock started
    SessionStarted {
        session_id: Uuid,
        started_at: DateTime<Utc>,
    },

    /// Narrative event (radio, race control, pit, ...)
    Notification {
        kind: EventKind,
        message: String,
        /// Recorded session time of the event
        time: f64,
    },

    /// Standings changed by an overtake
    Overtake {
        overtaker: u32,
        overtaken: u32,
        /// New position of the overtaker
        position: usize,
        /// Driver numbers in standings order after the swap
        order: Vec<u32>,
    },

    /// Sector or lap timing changed for a driver
    LapUpdate {
        driver_number: u32,
        update: TimingUpdate,
    },

    /// Transform commands for one replay step
    Replay { step: ReplayStep },

    /// Position replay ran out of samples
    ReplayFinished { steps: usize },

    /// Reply to `SelectDriver`
    DriverDetail { detail: Option<DriverDetail> },

    /// Session stopped; no further messages
    SessionStopped { session_id: Uuid },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Detail view of one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDetail {
    #[serde(flatten)]
    pub row: StandingRow,
    /// Last replay frame, if the car has been placed
    pub frame: Option<ReplayFrame>,
    /// Latest car telemetry at the current session time
    pub car: Option<CarSample>,
}
