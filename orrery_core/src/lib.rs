//! Orrery Core - smooth playback of irregular simulation snapshots.
//!
//! A remote service computes a simulation and delivers discrete, bursty
//! snapshots. This crate turns them into continuous motion at a fixed frame
//! rate:
//! 1. **Playout buffer**: a bounded, time-ordered window of snapshots plus
//!    the virtual clock that walks through it
//! 2. **Interpolation**: the state between the two snapshots bracketing the
//!    clock
//! 3. **Stream session**: the push connection and its reconnect policy
//!
//! The [`Orrery`] controller ties these to the render clock, trails and
//! viewport; [`runtime::run`] drives it from a single cooperative task.

pub mod snapshot;
pub mod interpolate;
pub mod playout;
pub mod render_clock;
pub mod session;
pub mod trails;
pub mod viewport;
pub mod catalog;
pub mod render;
pub mod controller;
pub mod runtime;

#[cfg(feature = "dashboard")]
pub mod dashboard;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use snapshot::{BodyState, Snapshot, SnapshotError};
pub use playout::{AdmitError, BufferConfig, PlayoutBuffer};
pub use render_clock::{ClockConfig, RenderClock};
pub use session::{SessionConfig, SessionState, StreamSessionManager};
pub use trails::{TrailConfig, TrailTracker};
pub use viewport::{ScreenBody, Surface, Viewport, ViewportConfig};
pub use catalog::{BodyDescriptor, Catalog, CatalogError};
pub use render::{RenderError, Renderer, Scene};
pub use controller::{Command, ControllerStats, Flow, Orrery, PlaybackConfig, RunError};
