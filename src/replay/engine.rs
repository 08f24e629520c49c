//! Sequential replay stepping

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::schedule::StopSignal;

use super::transform::unwrap_heading;
use super::{EntityTrack, PositionSample, ReplayCalibration, ReplayFrame, ReplayStep, TransformSink};

/// Produces replay step streams for a set of entity tracks
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    calibration: ReplayCalibration,
    stop: StopSignal,
}

impl ReplayEngine {
    pub fn new(calibration: ReplayCalibration, stop: StopSignal) -> Self {
        Self { calibration, stop }
    }

    pub fn calibration(&self) -> &ReplayCalibration {
        &self.calibration
    }

    /// Start a replay over `tracks`, anchored at the instant it is first polled.
    ///
    /// The stream yields one [`ReplayStep`] per shared sample index. Step
    /// `i + 1` is due once the summed deltas of steps `0..=i` have passed since
    /// the anchor, so timer lag never accumulates across steps. The stream is
    /// finite and cannot be restarted; call again with the tracks to replay from
    /// the top. A stop signal ends it before the next step.
    pub fn begin_replay(&self, tracks: Vec<EntityTrack>) -> BoxStream<'static, ReplayStep> {
        self.replay_from(tracks, None)
    }

    /// Like [`ReplayEngine::begin_replay`] but anchored at `anchor`, usually the
    /// session clock's start instant. Steps already due are yielded at once.
    pub fn begin_replay_at(
        &self,
        tracks: Vec<EntityTrack>,
        anchor: Instant,
    ) -> BoxStream<'static, ReplayStep> {
        self.replay_from(tracks, Some(anchor))
    }

    fn replay_from(
        &self,
        tracks: Vec<EntityTrack>,
        anchor: Option<Instant>,
    ) -> BoxStream<'static, ReplayStep> {
        let cursor = ReplayCursor::new(tracks, self.calibration);
        info!(
            entities = cursor.tracks.len(),
            steps = cursor.total_steps,
            "Replay started"
        );

        stream::unfold(
            (cursor, self.stop.clone(), anchor),
            |(mut cursor, stop, anchor)| async move {
                let anchor = anchor.unwrap_or_else(Instant::now);
                if cursor.due_offset > 0.0 {
                    let deadline = anchor
                        + Duration::try_from_secs_f64(cursor.due_offset).unwrap_or(Duration::ZERO);
                    tokio::select! {
                        biased;
                        _ = stop.stopped() => return None,
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                if stop.is_stopped() {
                    debug!(step = cursor.index, "Replay stopped");
                    return None;
                }

                let step = cursor.next_step()?;
                Some((step, (cursor, stop, Some(anchor))))
            },
        )
        .boxed()
    }
}

/// Number of steps a replay over `tracks` produces.
/// An entity with `n` samples contributes frames to steps `0..n-1`.
pub fn step_count(tracks: &[EntityTrack]) -> usize {
    tracks
        .iter()
        .map(|t| t.samples.len().saturating_sub(1))
        .max()
        .unwrap_or(0)
}

/// Push every step of `steps` into `sinks`; returns the number of steps
pub async fn drive<S>(mut steps: S, sinks: &[Arc<dyn TransformSink>]) -> usize
where
    S: Stream<Item = ReplayStep> + Unpin,
{
    let mut count = 0;
    while let Some(step) = steps.next().await {
        for sink in sinks {
            sink.apply_step(&step);
        }
        count += 1;
    }
    count
}

struct ReplayCursor {
    tracks: Vec<EntityTrack>,
    /// Last heading per track, seeded with each track's default
    headings: Vec<f64>,
    calibration: ReplayCalibration,
    index: usize,
    total_steps: usize,
    /// Seconds after the anchor at which the next step is due
    due_offset: f64,
}

impl ReplayCursor {
    fn new(tracks: Vec<EntityTrack>, calibration: ReplayCalibration) -> Self {
        let headings = tracks.iter().map(|t| t.default_heading).collect();
        let total_steps = step_count(&tracks);
        Self {
            tracks,
            headings,
            calibration,
            index: 0,
            total_steps,
            due_offset: 0.0,
        }
    }

    fn next_step(&mut self) -> Option<ReplayStep> {
        if self.index >= self.total_steps {
            return None;
        }

        let i = self.index;
        let delta = self.pacing_delta(i);
        let mut frames = Vec::with_capacity(self.tracks.len());

        for (track, heading) in self.tracks.iter().zip(self.headings.iter_mut()) {
            if !has_frame(track, i) {
                continue;
            }

            let current = &track.samples[i];
            if i > 0 {
                if let Some(raw) = self.calibration.heading(&track.samples[i - 1], current) {
                    *heading = unwrap_heading(*heading, raw);
                }
            }

            let (x, z) = self.calibration.to_world(current.x, current.z);
            frames.push(ReplayFrame {
                entity_id: track.entity_id,
                x,
                z,
                heading: *heading,
                duration: delta,
            });
        }

        self.index += 1;
        self.due_offset += delta;

        Some(ReplayStep {
            index: i,
            delta,
            frames,
        })
    }

    /// Delta of the first entity that still has a frame at `i`
    fn pacing_delta(&self, i: usize) -> f64 {
        if i == 0 {
            return 0.0;
        }
        self.tracks
            .iter()
            .find(|t| has_frame(t, i))
            .map(|t| sample_delta(&t.samples[i - 1], &t.samples[i]))
            .unwrap_or(0.0)
    }
}

fn has_frame(track: &EntityTrack, i: usize) -> bool {
    i + 1 < track.samples.len()
}

fn sample_delta(prev: &PositionSample, cur: &PositionSample) -> f64 {
    let delta = cur.timestamp - prev.timestamp;
    if delta.is_finite() {
        delta.max(0.0)
    } else {
        0.0
    }
}
