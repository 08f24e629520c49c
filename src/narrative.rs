//! Narrative events: radio calls, race control messages, pit and lap notices

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::schedule::{bucket_for, EventRegistry, Registration};
use crate::ws::feed::SessionFeed;
use crate::ws::protocol::FeedMsg;

/// Category of a narrative event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Laps,
    Pits,
    Overtake,
    Radio,
    Flag,
    /// Any other race control category
    Other(String),
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Laps" => EventKind::Laps,
            "Pits" => EventKind::Pits,
            "Overtake" => EventKind::Overtake,
            "Radio" => EventKind::Radio,
            "Flag" => EventKind::Flag,
            _ => EventKind::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Laps => f.write_str("Laps"),
            EventKind::Pits => f.write_str("Pits"),
            EventKind::Overtake => f.write_str("Overtake"),
            EventKind::Radio => f.write_str("Radio"),
            EventKind::Flag => f.write_str("Flag"),
            EventKind::Other(other) => f.write_str(other),
        }
    }
}

/// A time-anchored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Seconds from session start
    pub time: f64,
    pub message: String,
}

/// Registration results for a batch of narrative events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NarrativeSummary {
    pub queued: usize,
    pub missed: usize,
    /// Events with no valid time
    pub skipped: usize,
}

/// Register one feed notification per event, at the event's bucket
pub fn schedule_narrative(
    events: &[NarrativeEvent],
    registry: &EventRegistry,
    feed: &SessionFeed,
) -> NarrativeSummary {
    let mut summary = NarrativeSummary::default();

    for event in events {
        let Some(bucket) = bucket_for(event.time) else {
            warn!(kind = %event.kind, time = event.time, "Narrative event has no valid time");
            summary.skipped += 1;
            continue;
        };

        let feed = feed.clone();
        let event = event.clone();
        let registration = registry.register(bucket, move || {
            feed.publish(FeedMsg::Notification {
                kind: event.kind,
                message: event.message,
                time: event.time,
            });
            Ok(())
        });

        match registration {
            Registration::Queued => summary.queued += 1,
            Registration::Missed => summary.missed += 1,
        }
    }

    debug!(
        queued = summary.queued,
        missed = summary.missed,
        skipped = summary.skipped,
        "Narrative events scheduled"
    );
    summary
}
