//! Core environment context trait for the Orrery playout engine.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for time.
///
/// This trait abstracts the wall clock so that the render clock and the
/// reconnect timer run the same way in production (tokio) and in the
/// deterministic harness (virtual time).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `std::time::Instant` and `tokio::time`
/// - **Simulation**: `SimContext` - a manually advanced virtual clock
#[async_trait]
pub trait OrreryContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Feeds the render clock and the reconnect deadline.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;
    
    /// Suspends execution for the given duration.
    ///
    /// This is the per-frame scheduling yield of the runtime loop.
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual time
    async fn sleep(&self, duration: Duration);
}
