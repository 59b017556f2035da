//! Scene description handed to renderers.

use nalgebra::Point2;
use serde::Serialize;
use thiserror::Error;

use crate::session::SessionState;
use crate::viewport::{ScreenBody, Surface};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Recorded path of one body, oldest point first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailPath {
    pub label: String,
    pub color: String,
    pub points: Vec<Point2<f64>>,
}

/// Status line shown next to the drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneStatus {
    pub session: SessionState,
    pub buffered: usize,
    pub scale: f64,
    pub trails: bool,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    /// Sequence number of the frame since the controller was created
    pub frame: u64,

    /// Virtual time the bodies were reconstructed at
    pub sim_time: f64,

    pub surface: Surface,

    /// Projected markers in run order
    pub bodies: Vec<ScreenBody>,

    /// Trails of the drawn bodies; empty while trails are off
    pub trails: Vec<TrailPath>,

    pub status: SceneStatus,
}

/// Draws scenes somewhere.
pub trait Renderer {
    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError>;
}
