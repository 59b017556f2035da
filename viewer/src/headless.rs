//! Renderer for running without a terminal: frames become log lines.

use orrery_core::render::{RenderError, Renderer, Scene};
use tracing::{debug, info};

/// Logs a summary every `every` frames and a full line per frame at debug.
pub struct LogRenderer {
    every: u64,
    drawn: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            drawn: 0,
        }
    }

    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl Renderer for LogRenderer {
    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.drawn += 1;
        debug!(
            "frame {} t={:.0} bodies={} buffered={}",
            scene.frame,
            scene.sim_time,
            scene.bodies.len(),
            scene.status.buffered
        );

        if self.drawn % self.every == 0 {
            let day = scene.sim_time / 86_400.0;
            let positions: Vec<String> = scene
                .bodies
                .iter()
                .map(|b| format!("{}=({:.0},{:.0})", b.label, b.position.x, b.position.y))
                .collect();
            info!(
                "day {:.1} | {} | buffered {} | zoom {:.2} | {}",
                day,
                scene.status.session,
                scene.status.buffered,
                scene.status.scale,
                positions.join(" ")
            );
        }
        Ok(())
    }
}
