//! Viewport Transform - simulation space to render space.

use nalgebra::{Point2, Vector2};
use serde::Serialize;

use crate::snapshot::BodyState;

/// Zoom settings.
#[derive(Debug, Clone)]
pub struct ViewportConfig {
    pub initial_scale: f64,

    /// Factor applied per zoom action
    pub zoom_step: f64,

    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            initial_scale: 1.0,
            zoom_step: 1.2,
            min_scale: 0.01,
            max_scale: 10.0,
        }
    }
}

/// Size of the drawing surface in render units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Render-space position of the simulation origin.
    pub fn origin(&self) -> Point2<f64> {
        Point2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(800.0, 800.0)
    }
}

/// A body projected into render space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenBody {
    pub label: String,
    pub position: Point2<f64>,
    pub radius: f64,
    pub color: String,
}

/// Holds the zoom factor.
#[derive(Debug, Clone)]
pub struct Viewport {
    scale: f64,
    config: ViewportConfig,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        let scale = config.initial_scale.clamp(config.min_scale, config.max_scale);
        Self { scale, config }
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale / self.config.zoom_step);
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `origin + coordinate * scale`; radius grows with `sqrt(scale)` so
    /// marker area tracks zoom roughly linearly.
    pub fn project(&self, body: &BodyState, origin: Point2<f64>) -> ScreenBody {
        ScreenBody {
            label: body.label.clone(),
            position: origin + Vector2::new(body.x, body.y) * self.scale,
            radius: body.size * self.scale.sqrt(),
            color: body.color.clone(),
        }
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(self.config.min_scale, self.config.max_scale);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_projection_at_unit_scale() {
        let viewport = Viewport::default();
        let body = BodyState::new("Earth", 149.6, -20.0, 5.0, "blue");

        let screen = viewport.project(&body, Surface::new(800.0, 600.0).origin());

        assert_relative_eq!(screen.position.x, 549.6);
        assert_relative_eq!(screen.position.y, 280.0);
        assert_eq!(screen.radius, 5.0);
    }

    #[test]
    fn test_radius_scales_with_sqrt() {
        let mut viewport = Viewport::new(ViewportConfig {
            initial_scale: 4.0,
            ..ViewportConfig::default()
        });
        let body = BodyState::new("Sun", 0.0, 0.0, 10.0, "orange");

        assert_relative_eq!(viewport.project(&body, Point2::origin()).radius, 20.0);

        viewport.zoom_in();
        assert_relative_eq!(viewport.scale(), 4.8);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = Viewport::default();
        for _ in 0..100 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.scale(), 10.0);

        for _ in 0..200 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.scale(), 0.01);
    }

    proptest! {
        #[test]
        fn prop_scale_stays_in_bounds(zooms in prop::collection::vec(any::<bool>(), 0..500)) {
            let mut viewport = Viewport::default();
            for zoom_in in zooms {
                if zoom_in { viewport.zoom_in() } else { viewport.zoom_out() }
                prop_assert!(viewport.scale() >= 0.01 && viewport.scale() <= 10.0);
            }
        }
    }
}
