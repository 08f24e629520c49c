//! Application state shared across routes

use std::sync::Arc;

use chrono::Utc;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::narrative::{schedule_narrative, NarrativeSummary};
use crate::ranking::{default_grid, RankingBoard, RankingProcessor, StandingRow, Standings};
use crate::replay::{drive, EntityTrack, LatestFrames, ReplayEngine, ReplayStep, TransformSink};
use crate::schedule::{
    DispatchSnapshot, Dispatcher, DispatcherHandle, EventRegistry, Registration, StopSignal,
    TimeBucket,
};
use crate::telemetry::{CarTelemetry, SessionData};
use crate::util::time::SimulationClock;
use crate::ws::feed::SessionFeed;
use crate::ws::protocol::{DriverDetail, FeedMsg};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
}

impl AppState {
    pub fn new(config: Config, data: SessionData) -> Self {
        let session = Arc::new(Session::new(&config, data));
        Self {
            config: Arc::new(config),
            session,
        }
    }
}

/// One replayed session: clock, scheduled events, replay and standings
pub struct Session {
    id: Uuid,
    clock: SimulationClock,
    registry: Arc<EventRegistry>,
    standings: Standings,
    feed: SessionFeed,
    frames: Arc<LatestFrames>,
    stop: StopSignal,
    engine: ReplayEngine,
    tracks: Vec<EntityTrack>,
    car: CarTelemetry,
    narrative: NarrativeSummary,
    dispatcher: Mutex<Option<DispatcherHandle>>,
    replay: Mutex<Option<JoinHandle<usize>>>,
}

impl Session {
    /// Build the session and register every recorded event.
    /// Nothing fires until [`Session::start_clock`].
    pub fn new(config: &Config, data: SessionData) -> Self {
        let id = Uuid::new_v4();
        let feed = SessionFeed::new(config.feed_capacity);
        let registry = Arc::new(EventRegistry::new());
        let stop = StopSignal::new();

        let board = RankingBoard::new(data.roster.unwrap_or_else(default_grid));
        let standings = Standings::new(board, RankingProcessor::new(data.overtakes), feed.clone());

        let narrative = schedule_narrative(&data.events, &registry, &feed);
        let overtake_buckets = standings.schedule_overtakes(&registry);
        let timing_updates = standings.schedule_timing(&registry, &data.laps);

        info!(
            session_id = %id,
            narrative = narrative.queued,
            overtake_buckets,
            timing_updates,
            tracks = data.tracks.len(),
            "Session prepared"
        );

        Self {
            id,
            clock: SimulationClock::new(),
            registry,
            standings,
            feed,
            frames: Arc::new(LatestFrames::new()),
            engine: ReplayEngine::new(config.calibration, stop.clone()),
            stop,
            tracks: data.tracks,
            car: data.car,
            narrative,
            dispatcher: Mutex::new(None),
            replay: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn narrative_summary(&self) -> NarrativeSummary {
        self.narrative
    }

    /// Register `callback` to run once the clock reaches `bucket`
    pub fn subscribe<F>(&self, bucket: TimeBucket, callback: F) -> Registration
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.registry.register(bucket, callback)
    }

    pub fn subscribe_feed(&self) -> broadcast::Receiver<FeedMsg> {
        self.feed.subscribe()
    }

    pub fn feed(&self) -> &SessionFeed {
        &self.feed
    }

    /// Start the clock and the dispatcher. Returns `false` when already running
    /// or stopped.
    pub fn start_clock(&self) -> bool {
        if self.stop.is_stopped() {
            warn!(session_id = %self.id, "Session already stopped, clock not started");
            return false;
        }

        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return false;
        }

        self.clock.start();
        *dispatcher = Some(
            Dispatcher::new(self.clock.clone(), self.registry.clone(), self.stop.clone()).spawn(),
        );
        drop(dispatcher);

        self.feed.publish(FeedMsg::SessionStarted {
            session_id: self.id,
            started_at: Utc::now(),
        });
        info!(session_id = %self.id, "Session clock started");
        true
    }

    /// Seconds since the clock started, 0.0 before
    pub fn elapsed_time(&self) -> f64 {
        self.clock.elapsed()
    }

    /// A fresh replay over the loaded tracks, paced against the session clock
    /// once it runs
    pub fn begin_replay(&self) -> BoxStream<'static, ReplayStep> {
        match self.clock.started_at() {
            Some(start) => self.engine.begin_replay_at(self.tracks.clone(), start),
            None => self.engine.begin_replay(self.tracks.clone()),
        }
    }

    /// Drive the replay into the feed and the frame cache in the background.
    /// Returns `false` when a replay is already running.
    pub fn spawn_replay(&self) -> bool {
        let mut replay = self.replay.lock();
        if replay.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let steps = self.begin_replay();
        let feed_sink: Arc<dyn TransformSink> = Arc::new(self.feed.clone());
        let frame_sink: Arc<dyn TransformSink> = self.frames.clone();
        let sinks = vec![feed_sink, frame_sink];
        let feed = self.feed.clone();
        let session_id = self.id;

        *replay = Some(tokio::spawn(async move {
            let steps = drive(steps, &sinks).await;
            feed.publish(FeedMsg::ReplayFinished { steps });
            info!(session_id = %session_id, steps, "Replay finished");
            steps
        }));
        true
    }

    pub fn standings(&self) -> Vec<StandingRow> {
        self.standings.rows()
    }

    pub fn standings_service(&self) -> &Standings {
        &self.standings
    }

    /// Standings row, last replay frame and current car telemetry for one driver
    pub fn driver_detail(&self, driver_number: u32) -> Option<DriverDetail> {
        let row = self.standings.row(driver_number)?;
        Some(DriverDetail {
            row,
            frame: self.frames.get(driver_number),
            car: self.car.latest_at(driver_number, self.elapsed_time()),
        })
    }

    pub fn dispatch_stats(&self) -> Option<DispatchSnapshot> {
        self.dispatcher.lock().as_ref().map(DispatcherHandle::stats)
    }

    pub fn pending_callbacks(&self) -> usize {
        self.registry.pending_callbacks()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Stop dispatching and replaying. Callbacks already running complete
    /// before this returns.
    pub async fn stop(&self) {
        self.stop.stop();

        let dispatcher = self.dispatcher.lock().take();
        if let Some(handle) = dispatcher {
            let stats = handle.stop().await;
            info!(
                session_id = %self.id,
                buckets = stats.buckets,
                fired = stats.fired,
                failed = stats.failed,
                "Dispatcher stopped"
            );
        }

        let replay = self.replay.lock().take();
        if let Some(task) = replay {
            if let Err(e) = task.await {
                error!(session_id = %self.id, error = %e, "Replay task failed");
            }
        }

        self.feed.publish(FeedMsg::SessionStopped {
            session_id: self.id,
        });
    }
}
