//! Wall-clock context for the viewer.

use crate::OrreryContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic time measured from construction, on tokio's clock.
///
/// Using `tokio::time::Instant` keeps `now` and `sleep` on the same clock,
/// so a paused test runtime moves both together.
#[derive(Debug, Clone, Copy)]
pub struct TokioContext {
    epoch: Instant,
}

impl TokioContext {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrreryContext for TokioContext {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
