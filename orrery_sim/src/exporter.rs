//! Frame recorder and JSON exporter.
//!
//! Records the scenes a scenario renders so a run can be replayed or
//! plotted offline.

use orrery_core::render::{RenderError, Renderer, Scene};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One recorded frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Frame sequence number
    pub frame: u64,

    /// Virtual wall time the frame was drawn at, in seconds
    pub time_sec: f64,

    /// Simulation time shown
    pub sim_time: f64,

    /// Snapshots buffered when the frame was drawn
    pub buffered: usize,

    pub bodies: Vec<BodyPosition>,
}

/// Render-space position of one body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyPosition {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Collects every `every`-th frame it is asked to draw.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    every: u64,
    clock_sec: f64,
    frames: Vec<SimFrame>,
    seen: u64,
    last_sim_time: Option<f64>,
    regressions: u64,
}

impl FrameRecorder {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            ..Self::default()
        }
    }

    /// Sets the virtual time stamped on subsequent frames.
    pub fn set_clock(&mut self, time_sec: f64) {
        self.clock_sec = time_sec;
    }

    /// Frames drawn, recorded or not.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Frames whose sim time went backwards.
    pub fn regressions(&self) -> u64 {
        self.regressions
    }

    pub fn frames(&self) -> &[SimFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<SimFrame> {
        self.frames
    }
}

impl Renderer for FrameRecorder {
    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError> {
        if let Some(last) = self.last_sim_time {
            if scene.sim_time < last {
                self.regressions += 1;
            }
        }
        self.last_sim_time = Some(scene.sim_time);
        self.seen += 1;

        if (self.seen - 1) % self.every == 0 {
            self.frames.push(SimFrame {
                frame: scene.frame,
                time_sec: self.clock_sec,
                sim_time: scene.sim_time,
                buffered: scene.status.buffered,
                bodies: scene
                    .bodies
                    .iter()
                    .map(|b| BodyPosition {
                        label: b.label.clone(),
                        x: b.position.x,
                        y: b.position.y,
                        radius: b.radius,
                    })
                    .collect(),
            });
        }
        Ok(())
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Recorded frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Scenario counters
    pub metrics: serde_json::Value,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
            metrics: serde_json::Value::Null,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>, metrics: serde_json::Value) {
        self.passed = passed;
        self.failure_reason = failure_reason;
        self.metrics = metrics;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
