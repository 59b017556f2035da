//! Scenario runner - drives the playout controller through chaos scenarios.
//!
//! Each scenario runs the real [`Orrery`] controller against a
//! [`SimTransport`] under a seeded virtual clock. The loop advances time by
//! one poll interval per tick, pumps the transport, feeds the resulting
//! events to the controller, and checks the playback invariants after every
//! tick.

use crate::context::SimContext;
use crate::exporter::FrameRecorder;
use crate::feed::{solar_catalog, SyntheticFeed, DEFAULT_SIM_STEP};
use crate::scenarios::ScenarioId;
use crate::transport::{SimTransport, TransportStats};

use orrery_core::render::{Renderer, Scene};
use orrery_core::{BodyDescriptor, Command, Orrery, PlaybackConfig, SessionState, TrailConfig};
use orrery_env::{stream_channel, OrreryContext, StreamReceiver};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Violations kept verbatim in a result; the rest are only counted.
const MAX_REPORTED_VIOLATIONS: usize = 5;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    pub frames: u64,
    pub starved_frames: u64,
    pub admitted: u64,
    pub malformed: u64,
    pub rejected: u64,
    pub prefills: u64,
    pub fetch_failures: u64,
    pub connect_attempts: u64,
    pub reconnects_scheduled: u64,
    pub stale_events: u64,

    /// Scripted play/pause or hide/show actions
    pub user_actions: u64,

    /// Returns to view that left the buffer below target
    pub short_refills: u64,

    /// Largest buffer length observed
    pub max_buffered: usize,

    /// Largest distance between a drawn body and its exact position
    pub max_position_error: f64,

    /// Invariant violations detected
    pub violations: u64,

    /// What the simulated service did
    pub transport: TransportStats,
}

/// Runs chaos scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Bodies in the simulated run
    num_bodies: usize,

    /// Maximum duration in seconds
    max_duration_secs: f64,

    /// Playback settings under test
    config: PlaybackConfig,

    /// Record every n-th frame
    record_every: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_bodies: usize) -> Self {
        Self {
            seed,
            num_bodies: num_bodies.max(1),
            max_duration_secs: 10.0,
            config: PlaybackConfig {
                trails: TrailConfig {
                    enabled: true,
                    ..TrailConfig::default()
                },
                ..PlaybackConfig::default()
            },
            record_every: 10,
        }
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Sets how often frames are recorded for export.
    pub fn with_recording(mut self, every: u64) -> Self {
        self.record_every = every.max(1);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_recorded(scenario).0
    }

    /// Runs a scenario and also returns the recorded frames.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, FrameRecorder) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let mut recorder = FrameRecorder::new(self.record_every);
        let runtime = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                let result = self.failed(scenario, format!("Failed to build runtime: {}", e));
                return (result, recorder);
            }
        };

        let result = runtime.block_on(self.execute(scenario, &mut recorder));
        (result, recorder)
    }

    /// Body selection for the run: catalog order, padded with generated
    /// bodies when more are requested than the catalog holds.
    pub fn selection(&self) -> Vec<BodyDescriptor> {
        let catalog = solar_catalog();
        (0..self.num_bodies)
            .map(|i| {
                catalog
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| BodyDescriptor::new(&format!("Body-{}", i)))
            })
            .collect()
    }

    async fn execute(&self, scenario: ScenarioId, recorder: &mut FrameRecorder) -> ScenarioResult {
        let ctx = SimContext::shared(self.seed);
        let feed = SyntheticFeed::with_body_count(self.num_bodies, DEFAULT_SIM_STEP, ctx.derive_seed(1));
        let transport = Arc::new(SimTransport::new(ctx.clone(), feed, scenario.faults()));
        let (sink, mut events) = stream_channel();
        let mut orrery = Orrery::new(ctx.clone(), transport.clone(), sink, self.config.clone());

        if let Err(e) = orrery.begin_run(&self.selection()).await {
            return self.failed(scenario, format!("Run initialization failed: {}", e));
        }

        let step = self.config.clock.poll_interval;
        let total_ticks = (self.max_duration_secs / step.as_secs_f64()).ceil() as u64;
        let mut checker = InvariantChecker::new(&self.config, self.num_bodies);
        let mut metrics = ScenarioMetrics::default();
        let mut next_action = scenario.churn().map(|(lo, hi)| ctx.now() + ctx.between(lo, hi));

        for tick in 0..total_ticks {
            ctx.advance_time(step);
            let now = ctx.now();

            transport.pump(now);
            drain(&mut orrery, &mut events);

            if let (Some(at), Some((lo, hi))) = (next_action, scenario.churn()) {
                if now >= at {
                    let command = self.user_action(scenario, &orrery, &ctx);
                    debug!("t={:.2}s user action {:?}", now.as_secs_f64(), command);
                    let showing = command == Command::Visibility { visible: true };
                    orrery.update(command);
                    orrery.fetch_pending().await;
                    metrics.user_actions += 1;
                    if showing && orrery.buffer().len() < self.config.buffer.target_size {
                        metrics.short_refills += 1;
                    }
                    next_action = Some(now + ctx.between(lo, hi));
                }
            }

            let scene = orrery.tick();
            checker.check_state(tick, &orrery, &transport);
            if let Some(scene) = scene {
                checker.check_scene(tick, &orrery, &scene, &transport);
                recorder.set_clock(now.as_secs_f64());
                if let Err(e) = recorder.draw(&scene) {
                    checker.violation(tick, format!("recorder failed: {}", e));
                }
            }
        }

        // late errors from the last closes are still queued
        drain(&mut orrery, &mut events);
        metrics.transport = transport.stats();
        orrery.dispose();

        let stats = orrery.stats();
        let session = orrery.session().stats();
        metrics.frames = stats.frames;
        metrics.starved_frames = stats.starved_frames;
        metrics.admitted = stats.admitted;
        metrics.malformed = stats.malformed;
        metrics.rejected = stats.rejected;
        metrics.prefills = stats.prefills;
        metrics.fetch_failures = stats.fetch_failures;
        metrics.connect_attempts = session.connect_attempts;
        metrics.reconnects_scheduled = session.reconnects_scheduled;
        metrics.stale_events = session.stale_events;
        metrics.max_buffered = checker.max_buffered;
        metrics.max_position_error = checker.max_position_error;
        metrics.violations = checker.count;

        let failure = checker
            .first_failure()
            .or_else(|| self.assess(scenario, &metrics));

        if let Some(reason) = &failure {
            warn!("{} failed: {}", scenario.name(), reason);
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure.is_none(),
            total_ticks,
            final_time_secs: ctx.now().as_secs_f64(),
            failure_reason: failure,
            metrics,
        }
    }

    fn user_action(&self, scenario: ScenarioId, orrery: &Orrery<SimContext, SimTransport>, ctx: &SimContext) -> Command {
        match scenario {
            ScenarioId::VisibilityChurn => Command::Visibility {
                visible: !orrery.is_visible(),
            },
            _ => {
                if ctx.chance(0.7) {
                    Command::TogglePlay
                } else if ctx.chance(0.5) {
                    Command::ToggleTrails
                } else if ctx.chance(0.5) {
                    Command::ZoomIn
                } else {
                    Command::ZoomOut
                }
            }
        }
    }

    /// Scenario-specific pass criteria, checked once invariants held.
    fn assess(&self, scenario: ScenarioId, m: &ScenarioMetrics) -> Option<String> {
        let fps = self.config.clock.fps as f64;
        let expected_frames = (self.max_duration_secs * fps) as u64;

        match scenario {
            ScenarioId::Steady => {
                if m.frames < expected_frames * 9 / 10 {
                    Some(format!("Only {} of {} frames rendered", m.frames, expected_frames))
                } else if m.reconnects_scheduled > 0 {
                    Some(format!("{} reconnects on a clean stream", m.reconnects_scheduled))
                } else if m.max_position_error > 1.0 {
                    Some(format!("Position error {:.3} exceeds 1.0", m.max_position_error))
                } else {
                    None
                }
            }
            ScenarioId::Jitter => {
                if m.frames < expected_frames / 2 {
                    Some(format!("Only {} of {} frames rendered", m.frames, expected_frames))
                } else if m.transport.reordered > 0 && m.rejected == 0 {
                    Some("Reordered snapshots were all admitted".to_string())
                } else {
                    None
                }
            }
            ScenarioId::FlakyStream => {
                let failures = m.transport.disconnects_injected + m.transport.open_failures;
                if failures > 0 && m.reconnects_scheduled == 0 {
                    Some("Stream failures never scheduled a reconnect".to_string())
                } else if m.connect_attempts != m.transport.opens + m.transport.open_failures {
                    Some(format!(
                        "{} connect attempts but {} opens seen by the service",
                        m.connect_attempts,
                        m.transport.opens + m.transport.open_failures
                    ))
                } else if m.transport.late_errors > 0 && m.stale_events == 0 {
                    Some("Late errors were not recognised as stale".to_string())
                } else {
                    None
                }
            }
            ScenarioId::PauseChurn => (m.user_actions == 0).then(|| "No user actions were scripted".to_string()),
            ScenarioId::VisibilityChurn => {
                (m.short_refills > 0).then(|| format!("{} returns to view left the buffer short", m.short_refills))
            }
            ScenarioId::CorruptFeed => {
                if m.transport.corrupt_sent > 0 && m.malformed + m.rejected == 0 {
                    Some("Corrupt payloads were admitted".to_string())
                } else if m.frames == 0 {
                    Some("No frames rendered".to_string())
                } else {
                    None
                }
            }
            ScenarioId::Backlog => (m.max_buffered <= self.config.buffer.target_size)
                .then(|| format!("Buffer never exceeded target ({} max)", m.max_buffered)),
        }
    }

    fn failed(&self, scenario: ScenarioId, reason: String) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
        }
    }
}

fn drain(orrery: &mut Orrery<SimContext, SimTransport>, events: &mut StreamReceiver) {
    while let Ok((handle, event)) = events.try_recv() {
        orrery.update(Command::Stream { handle, event });
    }
}

// =============================================================================
// INVARIANTS
// =============================================================================

/// Checks playback invariants tick by tick.
struct InvariantChecker {
    hard_ceiling: usize,
    trail_capacity: usize,
    min_scale: f64,
    max_scale: f64,
    num_bodies: usize,
    last_sim_time: Option<f64>,
    max_buffered: usize,
    max_position_error: f64,
    count: u64,
    reported: Vec<String>,
}

impl InvariantChecker {
    fn new(config: &PlaybackConfig, num_bodies: usize) -> Self {
        Self {
            hard_ceiling: config.buffer.hard_ceiling,
            trail_capacity: config.trails.capacity,
            min_scale: config.viewport.min_scale,
            max_scale: config.viewport.max_scale,
            num_bodies,
            last_sim_time: None,
            max_buffered: 0,
            max_position_error: 0.0,
            count: 0,
            reported: Vec::new(),
        }
    }

    fn violation(&mut self, tick: u64, message: String) {
        self.count += 1;
        if self.reported.len() < MAX_REPORTED_VIOLATIONS {
            warn!("tick {}: {}", tick, message);
            self.reported.push(format!("tick {}: {}", tick, message));
        }
    }

    fn first_failure(&self) -> Option<String> {
        self.reported.first().map(|first| {
            if self.count > 1 {
                format!("{} (+{} more violations)", first, self.count - 1)
            } else {
                first.clone()
            }
        })
    }

    fn check_state(&mut self, tick: u64, orrery: &Orrery<SimContext, SimTransport>, transport: &SimTransport) {
        let buffer = orrery.buffer();
        self.max_buffered = self.max_buffered.max(buffer.len());

        if buffer.len() > self.hard_ceiling {
            self.violation(tick, format!("buffer holds {} > ceiling {}", buffer.len(), self.hard_ceiling));
        }

        let times: Vec<f64> = buffer.snapshots().map(|s| s.timestamp).collect();
        if times.windows(2).any(|w| w[0] > w[1]) {
            self.violation(tick, "buffer timestamps out of order".to_string());
        }

        if let (Some(head), Some(tail)) = (times.first(), times.last()) {
            let t = buffer.sim_time();
            if times.len() >= 2 && (t < *head || t > *tail) {
                self.violation(tick, format!("sim time {} outside [{}, {}]", t, head, tail));
            }
        }

        if orrery.stats().admitted >= 2 && buffer.len() < 2 {
            self.violation(tick, format!("buffer drained to {} snapshots", buffer.len()));
        }

        let live = transport.live_streams();
        if live > 1 {
            self.violation(tick, format!("{} streams open at once", live));
        }

        let active = orrery.is_playing() && orrery.is_visible();
        let session = orrery.session();
        if !active {
            if live > 0 {
                self.violation(tick, "stream open while stopped".to_string());
            }
            if session.reconnect_deadline().is_some() {
                self.violation(tick, "reconnect pending while stopped".to_string());
            }
        } else if session.state() == SessionState::Disconnected && session.reconnect_deadline().is_none() {
            self.violation(tick, "disconnected while playing with no reconnect pending".to_string());
        }

        if let Some((label, trail)) = orrery.trails().iter().find(|(_, t)| t.len() > self.trail_capacity) {
            self.violation(tick, format!("trail of {} holds {} points", label, trail.len()));
        }

        let scale = orrery.viewport().scale();
        if scale < self.min_scale || scale > self.max_scale {
            self.violation(tick, format!("zoom {} out of bounds", scale));
        }
    }

    fn check_scene(
        &mut self,
        tick: u64,
        orrery: &Orrery<SimContext, SimTransport>,
        scene: &Scene,
        transport: &SimTransport,
    ) {
        if !(orrery.is_playing() && orrery.is_visible()) {
            self.violation(tick, "frame drawn while stopped".to_string());
        }

        if let Some(last) = self.last_sim_time {
            if scene.sim_time < last {
                self.violation(tick, format!("sim time went back from {} to {}", last, scene.sim_time));
            }
        }
        self.last_sim_time = Some(scene.sim_time);

        if scene.bodies.len() != self.num_bodies {
            self.violation(tick, format!("{} bodies drawn, expected {}", scene.bodies.len(), self.num_bodies));
        }

        let origin = scene.surface.origin();
        let scale = scene.status.scale;
        for (drawn, exact) in scene.bodies.iter().zip(transport.exact_state(scene.sim_time)) {
            let dx = drawn.position.x - (origin.x + exact.x * scale);
            let dy = drawn.position.y - (origin.y + exact.y * scale);
            self.max_position_error = self.max_position_error.max(dx.hypot(dy) / scale);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
