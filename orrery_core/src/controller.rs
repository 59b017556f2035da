//! The Orrery controller - one owned object per viewing session.
//!
//! Holds the playout buffer, render clock, stream session, trails and
//! viewport together with the play and visibility intents. Every input
//! (user action, focus change, transport event) arrives as a [`Command`];
//! frames come out of [`Orrery::tick`].
//!
//! Streaming runs only while the user wants to play *and* the view is
//! visible. A manual pause is remembered across a hide/show cycle.

use orrery_env::{EnvError, OrreryContext, SnapshotTransport, StreamEvent, StreamHandle, StreamSink};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{self, BodyDescriptor, CatalogError};
use crate::playout::{BufferConfig, PlayoutBuffer, Sample};
use crate::render::{Scene, SceneStatus, TrailPath};
use crate::render_clock::{ClockConfig, RenderClock};
use crate::session::{SessionConfig, SessionState, StreamSessionManager};
use crate::snapshot::Snapshot;
use crate::trails::{TrailConfig, TrailTracker};
use crate::viewport::{Surface, Viewport, ViewportConfig};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Everything tunable about playback.
#[derive(Debug, Clone, Default)]
pub struct PlaybackConfig {
    pub buffer: BufferConfig,
    pub clock: ClockConfig,
    pub session: SessionConfig,
    pub trails: TrailConfig,
    pub viewport: ViewportConfig,
    pub surface: Surface,
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Inputs consumed by [`Orrery::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    ToggleTrails,
    ZoomIn,
    ZoomOut,
    /// The view was hidden or shown again
    Visibility { visible: bool },
    /// The drawing surface changed size
    Resize { width: f64, height: f64 },
    /// Top the buffer up from the batch endpoint
    Refill,
    /// Outcome of a batch request handed out by [`Orrery::take_fetch`]
    Batch {
        requested: usize,
        result: Result<String, EnvError>,
    },
    /// An event from the push transport
    Stream { handle: StreamHandle, event: StreamEvent },
    Shutdown,
}

/// Whether the caller should keep driving the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to initialize run: {0}")]
    Init(#[from] EnvError),

    #[error("Controller already disposed")]
    Disposed,
}

/// Counters for logging and harness assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Frames produced by `tick`
    pub frames: u64,

    /// Due frames skipped because fewer than two snapshots were held
    pub starved_frames: u64,

    /// Snapshots admitted, from either path
    pub admitted: u64,

    /// Payloads that failed to decode or validate
    pub malformed: u64,

    /// Decoded snapshots refused by the admission policy
    pub rejected: u64,

    /// Batch requests issued
    pub prefills: u64,

    /// Batch requests that failed
    pub fetch_failures: u64,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Owned playback session.
pub struct Orrery<C: OrreryContext, T: SnapshotTransport> {
    ctx: Arc<C>,
    transport: Arc<T>,
    config: PlaybackConfig,
    buffer: PlayoutBuffer,
    render_clock: RenderClock,
    session: StreamSessionManager<T>,
    trails: TrailTracker,
    viewport: Viewport,
    surface: Surface,
    playing: bool,
    visible: bool,
    disposed: bool,
    /// Batch size waiting to be picked up by the driver
    fetch_due: Option<usize>,
    fetch_in_flight: bool,
    /// Streaming resumes once the refill for a show has landed
    resume_after_batch: bool,
    stats: ControllerStats,
}

impl<C: OrreryContext, T: SnapshotTransport> Orrery<C, T> {
    /// Creates a paused, visible controller. Transport events are reported
    /// on `sink`; the caller feeds them back as [`Command::Stream`].
    pub fn new(ctx: Arc<C>, transport: Arc<T>, sink: StreamSink, config: PlaybackConfig) -> Self {
        let session = StreamSessionManager::new(transport.clone(), sink, config.session.clone());
        Self {
            buffer: PlayoutBuffer::new(config.buffer.clone()),
            render_clock: RenderClock::new(config.clock.frame_interval()),
            trails: TrailTracker::new(config.trails.clone()),
            viewport: Viewport::new(config.viewport.clone()),
            surface: config.surface,
            session,
            ctx,
            transport,
            config,
            playing: false,
            visible: true,
            disposed: false,
            fetch_due: None,
            fetch_in_flight: false,
            resume_after_batch: false,
            stats: ControllerStats::default(),
        }
    }

    /// Prefills the buffer, then plays.
    pub async fn start(&mut self) {
        if self.disposed {
            return;
        }
        self.prefill().await;
        self.play();
    }

    /// Starts a fresh server-side run with `selection` and plays it from
    /// the beginning.
    pub async fn begin_run(&mut self, selection: &[BodyDescriptor]) -> Result<(), RunError> {
        if self.disposed {
            return Err(RunError::Disposed);
        }
        let payload = catalog::init_payload(selection)?;

        self.pause();
        self.transport.init_run(payload).await?;
        info!("Started run with {} bodies", selection.len());

        self.buffer.reset();
        self.trails.reset();
        self.start().await;
        Ok(())
    }

    /// Stops streaming and drawing.
    pub fn pause(&mut self) {
        if self.playing {
            info!("Playback paused");
        }
        self.playing = false;
        self.session.stop();
    }

    /// Tears the session down. Every later command is refused.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.playing = false;
        self.fetch_due = None;
        self.resume_after_batch = false;
        self.session.stop();
        self.disposed = true;
        info!("Controller disposed after {} frames", self.stats.frames);
    }

    /// Applies one command.
    ///
    /// Never waits on the network: refills only queue a batch request, which
    /// the driver collects with [`Orrery::take_fetch`] and answers with
    /// [`Command::Batch`].
    pub fn update(&mut self, command: Command) -> Flow {
        if self.disposed {
            debug!("ignoring {:?} after dispose", command);
            return Flow::Exit;
        }

        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::TogglePlay => {
                if self.playing {
                    self.pause();
                } else {
                    self.play();
                }
            }
            Command::ToggleTrails => {
                let enabled = self.trails.toggle();
                debug!("trails {}", if enabled { "on" } else { "off" });
            }
            Command::ZoomIn => self.viewport.zoom_in(),
            Command::ZoomOut => self.viewport.zoom_out(),
            Command::Visibility { visible } => self.set_visible(visible),
            Command::Resize { width, height } => {
                self.surface = Surface::new(width, height);
            }
            Command::Refill => self.request_refill(),
            Command::Batch { requested, result } => {
                self.fetch_in_flight = false;
                self.absorb_batch(requested, result);
                if std::mem::take(&mut self.resume_after_batch) && self.is_active() {
                    self.resume();
                }
            }
            Command::Stream { handle, event } => {
                let now = self.ctx.now();
                if let Some(payload) = self.session.on_event(handle, event, now) {
                    self.ingest(&payload);
                }
            }
            Command::Shutdown => {
                self.dispose();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// One scheduling opportunity: fires a due reconnect, then produces a
    /// scene if a frame is due and playback is active.
    pub fn tick(&mut self) -> Option<Scene> {
        if self.disposed {
            return None;
        }
        let now = self.ctx.now();
        self.session.poll_reconnect(now);

        if !self.render_clock.poll(now) || !self.is_active() {
            return None;
        }

        match self.buffer.sample() {
            Ok(sample) => Some(self.compose(sample)),
            Err(e) => {
                self.stats.starved_frames += 1;
                debug!("frame skipped: {}", e);
                None
            }
        }
    }

    /// Requests enough snapshots to reach the target size and waits for
    /// them. Used before the render loop starts.
    pub async fn prefill(&mut self) {
        self.request_refill();
        self.fetch_pending().await;
    }

    /// Performs a batch request queued by [`Command::Refill`] or a show, if
    /// any, and applies its outcome.
    pub async fn fetch_pending(&mut self) {
        if let Some(requested) = self.take_fetch() {
            let result = self.transport.fetch(requested).await;
            self.update(Command::Batch { requested, result });
        }
    }

    /// Hands a queued batch request to the driver. The driver performs the
    /// fetch and reports it back as [`Command::Batch`].
    pub fn take_fetch(&mut self) -> Option<usize> {
        let requested = self.fetch_due.take()?;
        self.fetch_in_flight = true;
        Some(requested)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// True while a batch request is queued or outstanding.
    pub fn is_fetching(&self) -> bool {
        self.fetch_due.is_some() || self.fetch_in_flight
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &StreamSessionManager<T> {
        &self.session
    }

    pub fn buffer(&self) -> &PlayoutBuffer {
        &self.buffer
    }

    pub fn trails(&self) -> &TrailTracker {
        &self.trails
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn is_active(&self) -> bool {
        self.playing && self.visible
    }

    fn play(&mut self) {
        if !self.playing {
            info!("Playback started");
        }
        self.playing = true;
        if self.visible {
            self.resume();
        }
    }

    fn resume(&mut self) {
        let now = self.ctx.now();
        if self.session.state() == SessionState::Disconnected {
            self.render_clock.reset(now);
        }
        self.session.start(now);
    }

    fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;

        if visible {
            // A manual pause outlives the hide/show cycle; only the stream
            // that hiding stopped comes back.
            debug!("view visible again, refilling");
            self.resume_after_batch = true;
            self.request_refill();
            if !self.is_fetching() {
                self.resume_after_batch = false;
                if self.playing {
                    self.resume();
                }
            }
        } else {
            debug!("view hidden, suspending stream");
            self.session.stop();
        }
    }

    fn request_refill(&mut self) {
        if self.is_fetching() {
            debug!("refill already pending");
            return;
        }
        let count = self.buffer.free_slots();
        if count == 0 {
            debug!("prefill skipped, buffer at target");
            return;
        }
        self.stats.prefills += 1;
        self.fetch_due = Some(count);
    }

    fn absorb_batch(&mut self, requested: usize, result: Result<String, EnvError>) {
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                self.stats.fetch_failures += 1;
                warn!("Prefill of {} snapshots failed: {}", requested, e);
                return;
            }
        };

        match Snapshot::batch_from_json(&body) {
            Ok(batch) => {
                self.stats.malformed += batch.rejected as u64;
                let report = self.buffer.admit_batch(batch.snapshots);
                self.stats.admitted += report.admitted as u64;
                self.stats.rejected += report.rejected as u64;
                debug!(
                    "prefill: requested {}, admitted {}, dropped {}",
                    requested,
                    report.admitted,
                    report.rejected + batch.rejected
                );
            }
            Err(e) => {
                self.stats.fetch_failures += 1;
                warn!("Prefill response unusable: {}", e);
            }
        }
    }

    fn ingest(&mut self, payload: &str) {
        let snapshot = match Snapshot::from_json(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.malformed += 1;
                debug!("dropping stream message: {}", e);
                return;
            }
        };

        match self.buffer.admit(snapshot) {
            Ok(()) => self.stats.admitted += 1,
            Err(e) => {
                self.stats.rejected += 1;
                debug!("snapshot refused: {}", e);
            }
        }
    }

    fn compose(&mut self, sample: Sample) -> Scene {
        let origin = self.surface.origin();

        let bodies: Vec<_> = sample
            .bodies
            .iter()
            .map(|body| self.viewport.project(body, origin))
            .collect();

        for body in &bodies {
            self.trails.record(&body.label, body.position);
        }

        let trails = if self.trails.is_enabled() {
            bodies
                .iter()
                .filter_map(|body| {
                    self.trails.trail(&body.label).map(|points| TrailPath {
                        label: body.label.clone(),
                        color: body.color.clone(),
                        points: points.iter().copied().collect(),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        self.stats.frames += 1;

        Scene {
            frame: self.stats.frames,
            sim_time: sample.sim_time,
            surface: self.surface,
            bodies,
            trails,
            status: SceneStatus {
                session: self.session.state(),
                buffered: self.buffer.len(),
                scale: self.viewport.scale(),
                trails: self.trails.is_enabled(),
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, ManualContext};
    use orrery_env::{stream_channel, StreamReceiver};
    use std::time::Duration;

    const FRAME: Duration = Duration::from_millis(34);

    fn snapshot_json(t: f64, x: f64) -> String {
        format!(
            r#"{{"timestamp": {}, "bodies": [{{"label": "Earth", "x": {}, "y": 0, "size": 4, "color": "blue"}}]}}"#,
            t, x
        )
    }

    fn batch_json(times: &[f64]) -> String {
        let items: Vec<String> = times.iter().map(|t| snapshot_json(*t, *t)).collect();
        format!("[{}]", items.join(","))
    }

    struct Harness {
        orrery: Orrery<ManualContext, FakeTransport>,
        ctx: Arc<ManualContext>,
        transport: Arc<FakeTransport>,
        _events: StreamReceiver,
    }

    fn harness() -> Harness {
        let ctx = Arc::new(ManualContext::default());
        let transport = Arc::new(FakeTransport::default());
        let (sink, events) = stream_channel();
        let config = PlaybackConfig {
            buffer: BufferConfig {
                render_step: 1.0,
                ..BufferConfig::default()
            },
            ..PlaybackConfig::default()
        };
        let orrery = Orrery::new(ctx.clone(), transport.clone(), sink, config);
        Harness {
            orrery,
            ctx,
            transport,
            _events: events,
        }
    }

    fn message(h: &mut Harness, payload: String) {
        let handle = h.orrery.session().live_handle().unwrap();
        h.orrery.update(Command::Stream {
            handle,
            event: StreamEvent::Message(payload),
        });
    }

    #[tokio::test]
    async fn test_start_prefills_then_streams() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[0.0, 1.0, 2.0]));

        h.orrery.start().await;

        assert_eq!(h.transport.fetch_requests(), vec![10]);
        assert_eq!(h.orrery.buffer().len(), 3);
        assert!(h.orrery.is_playing());
        assert_eq!(h.orrery.session_state(), SessionState::Connecting);
        assert_eq!(h.transport.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_tick_renders_interpolated_scene() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[0.0, 2.0]));
        h.orrery.start().await;

        assert!(h.orrery.tick().is_none());
        h.ctx.advance(FRAME);
        let first = h.orrery.tick().unwrap();
        h.ctx.advance(FRAME);
        let second = h.orrery.tick().unwrap();

        let origin = h.orrery.surface().origin();
        assert_eq!(first.sim_time, 0.0);
        assert_eq!(second.sim_time, 1.0);
        assert_eq!(second.bodies[0].position.x, origin.x + 1.0);
        assert_eq!(second.frame, 2);
    }

    #[tokio::test]
    async fn test_stream_messages_are_admitted() {
        let mut h = harness();
        h.orrery.start().await;

        message(&mut h, snapshot_json(5.0, 0.0));
        message(&mut h, snapshot_json(6.0, 0.0));
        message(&mut h, snapshot_json(5.5, 0.0));
        message(&mut h, "{not json".to_string());

        let stats = h.orrery.stats();
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(h.orrery.session_state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn test_paused_draws_nothing() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[0.0, 1.0, 2.0]));
        h.orrery.start().await;
        h.orrery.update(Command::Pause);

        h.ctx.advance(Duration::from_secs(1));

        assert!(h.orrery.tick().is_none());
        assert_eq!(h.orrery.buffer().sim_time(), 0.0);
        assert!(h.transport.live().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_play_reconnects_once() {
        let mut h = harness();
        h.orrery.start().await;

        h.orrery.update(Command::TogglePlay);
        h.orrery.update(Command::TogglePlay);

        assert!(h.orrery.is_playing());
        assert_eq!(h.transport.opened().len(), 2);
        assert_eq!(h.transport.live().len(), 1);
    }

    #[tokio::test]
    async fn test_visibility_cycle_refills_and_resumes() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[0.0, 1.0]));
        h.orrery.start().await;

        h.orrery.update(Command::Visibility { visible: false });
        assert!(h.transport.live().is_empty());
        assert!(h.orrery.is_playing());

        h.transport.push_batch(&batch_json(&[2.0, 3.0]));
        h.orrery.update(Command::Visibility { visible: true });

        // the stream waits for the refill
        assert!(h.orrery.is_fetching());
        assert!(h.transport.live().is_empty());

        h.orrery.fetch_pending().await;

        assert_eq!(h.transport.fetch_requests(), vec![10, 8]);
        assert_eq!(h.orrery.buffer().len(), 4);
        assert_eq!(h.transport.live().len(), 1);
        assert!(!h.orrery.is_fetching());
    }

    #[tokio::test]
    async fn test_hidden_again_before_refill_lands() {
        let mut h = harness();
        h.orrery.start().await;

        h.orrery.update(Command::Visibility { visible: false });
        h.orrery.update(Command::Visibility { visible: true });
        let requested = h.orrery.take_fetch().unwrap();
        h.orrery.update(Command::Visibility { visible: false });

        h.orrery.update(Command::Batch {
            requested,
            result: Ok(batch_json(&[0.0, 1.0])),
        });

        assert_eq!(h.orrery.buffer().len(), 2);
        assert!(h.transport.live().is_empty());
    }

    #[tokio::test]
    async fn test_refill_is_queued_not_awaited() {
        let mut h = harness();
        h.orrery.start().await;

        h.orrery.update(Command::Refill);
        h.orrery.update(Command::Refill);

        assert_eq!(h.transport.fetch_requests(), vec![10]);
        assert_eq!(h.orrery.take_fetch(), Some(10));
        assert_eq!(h.orrery.take_fetch(), None);

        // frames keep coming while the request is out
        h.orrery.update(Command::Batch {
            requested: 10,
            result: Err(EnvError::Timeout(10_000)),
        });
        assert_eq!(h.orrery.stats().fetch_failures, 1);
        assert_eq!(h.orrery.stats().prefills, 2);
        assert!(!h.orrery.is_fetching());
    }

    #[tokio::test]
    async fn test_manual_pause_survives_visibility_cycle() {
        let mut h = harness();
        h.orrery.start().await;
        h.orrery.update(Command::Pause);

        h.orrery.update(Command::Visibility { visible: false });
        h.orrery.update(Command::Visibility { visible: true });
        h.orrery.fetch_pending().await;

        assert!(!h.orrery.is_playing());
        assert!(h.transport.live().is_empty());
        assert_eq!(h.transport.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_fires_from_tick() {
        let mut h = harness();
        h.orrery.start().await;
        let handle = h.orrery.session().live_handle().unwrap();

        h.orrery.update(Command::Stream {
            handle,
            event: StreamEvent::Error("reset".into()),
        });
        assert_eq!(h.orrery.session_state(), SessionState::Disconnected);

        h.ctx.advance(Duration::from_millis(999));
        h.orrery.tick();
        assert_eq!(h.transport.opened().len(), 1);

        h.ctx.advance(Duration::from_millis(1));
        h.orrery.tick();
        assert_eq!(h.transport.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_buffer_underfilled() {
        let mut h = harness();
        h.transport.push_fetch_error("503");

        h.orrery.start().await;

        assert!(h.orrery.buffer().is_empty());
        assert_eq!(h.orrery.stats().fetch_failures, 1);
        assert!(h.orrery.is_playing());
    }

    #[tokio::test]
    async fn test_full_buffer_skips_fetch() {
        let mut h = harness();
        let times: Vec<f64> = (0..10).map(|t| t as f64).collect();
        h.transport.push_batch(&batch_json(&times));
        h.orrery.start().await;

        h.orrery.update(Command::Refill);

        assert!(!h.orrery.is_fetching());
        assert_eq!(h.orrery.take_fetch(), None);
        assert_eq!(h.transport.fetch_requests(), vec![10]);
    }

    #[tokio::test]
    async fn test_trails_follow_rendered_positions() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[0.0, 1.0, 2.0, 3.0]));
        h.orrery.start().await;
        h.orrery.update(Command::ToggleTrails);

        for _ in 0..3 {
            h.ctx.advance(FRAME);
            h.orrery.tick();
        }
        h.ctx.advance(FRAME);
        let scene = h.orrery.tick().unwrap();
        assert_eq!(scene.trails[0].points.len(), 4);

        h.orrery.update(Command::ToggleTrails);
        assert!(h.orrery.trails().iter().all(|(_, t)| t.is_empty()));
    }

    #[tokio::test]
    async fn test_zoom_and_resize_shape_projection() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[0.0, 1.0]));
        h.orrery.start().await;

        h.orrery.update(Command::Resize { width: 200.0, height: 100.0 });
        h.orrery.update(Command::ZoomIn);

        h.ctx.advance(FRAME);
        let scene = h.orrery.tick().unwrap();

        assert_eq!(scene.surface, Surface::new(200.0, 100.0));
        assert_eq!(scene.bodies[0].position.x, 100.0);
        assert!((scene.status.scale - 1.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_begin_run_posts_selection_and_resets() {
        let mut h = harness();
        h.transport.push_batch(&batch_json(&[100.0, 101.0]));
        h.orrery.start().await;

        h.transport.push_batch(&batch_json(&[0.0, 1.0]));
        let selection = vec![BodyDescriptor::new("Sun"), BodyDescriptor::new("Earth")];
        h.orrery.begin_run(&selection).await.unwrap();

        let payloads = h.transport.init_payloads();
        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].contains("\"Earth\""));
        assert_eq!(h.orrery.buffer().head().unwrap().timestamp, 0.0);
        assert_eq!(h.transport.live().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_disposes() {
        let mut h = harness();
        h.orrery.start().await;

        assert_eq!(h.orrery.update(Command::Shutdown), Flow::Exit);
        assert!(h.orrery.is_disposed());
        assert!(h.transport.live().is_empty());
        assert_eq!(h.orrery.update(Command::Play), Flow::Exit);
        assert!(h.transport.live().is_empty());
    }
}
