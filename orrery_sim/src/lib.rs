//! Orrery Deterministic Simulation Testing (DST) Harness
//!
//! Runs the real playback controller against a simulated snapshot service
//! under a seeded virtual clock, so every stream, fault and user action is
//! reproducible from a single 64-bit seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                        │
//! │                                                          │
//! │  SimContext ──── virtual clock + seeded RNG              │
//! │       │                                                  │
//! │  ┌────▼─────────┐  StreamEvent   ┌────────────────────┐  │
//! │  │ SimTransport │ ─────────────► │ Orrery (controller)│  │
//! │  │  (faults)    │ ◄───────────── │                    │  │
//! │  └────┬─────────┘ open/close/    └─────────┬──────────┘  │
//! │       │           fetch/init               │ Scene       │
//! │  ┌────▼──────────┐              ┌──────────▼─────────┐   │
//! │  │ SyntheticFeed │              │ InvariantChecker + │   │
//! │  │ (exact orbits)│              │ FrameRecorder      │   │
//! │  └───────────────┘              └────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use orrery_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 4)
//!     .with_duration(10.0)
//!     .run(ScenarioId::FlakyStream);
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod feed;
mod runner;
pub mod scenarios;
mod transport;

pub use context::SimContext;
pub use exporter::{BodyPosition, FrameRecorder, SimExport, SimFrame};
pub use feed::{solar_catalog, OrbitSpec, SyntheticFeed, DEFAULT_SIM_STEP};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use transport::{FaultConfig, SimTransport, TransportStats};
