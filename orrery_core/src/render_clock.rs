//! Fixed-rate frame pacing driven by an external time source.
//!
//! The clock never looks at a system clock itself; the caller passes the
//! current monotonic time on every scheduling opportunity. Only the excess
//! over a whole interval is carried into the next frame, so a long stall
//! produces one frame rather than a catch-up burst.

use std::time::Duration;

/// Frame pacing configuration.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Target frames per second
    pub fps: u32,

    /// How often the runtime loop wakes up to ask for a frame
    pub poll_interval: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            poll_interval: Duration::from_secs_f64(1.0 / 120.0),
        }
    }
}

impl ClockConfig {
    /// Target frame interval (`1000 / fps` ms).
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

/// Decides, per scheduling opportunity, whether a frame is due.
#[derive(Debug, Clone)]
pub struct RenderClock {
    interval: Duration,
    last: Duration,
    frames: u64,
}

impl RenderClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Duration::ZERO,
            frames: 0,
        }
    }

    /// Restarts pacing from `now`; the next frame is due one interval later.
    pub fn reset(&mut self, now: Duration) {
        self.last = now;
    }

    /// Returns true when at least one interval has elapsed since the last
    /// frame, keeping only the sub-interval remainder.
    pub fn poll(&mut self, now: Duration) -> bool {
        if self.interval.is_zero() {
            self.frames += 1;
            return true;
        }
        let elapsed = now.saturating_sub(self.last);
        if elapsed < self.interval {
            return false;
        }

        let excess = Duration::from_nanos((elapsed.as_nanos() % self.interval.as_nanos()) as u64);
        self.last = now - excess;
        self.frames += 1;
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Frames granted since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
