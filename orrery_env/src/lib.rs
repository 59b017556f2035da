//! Orrery Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seams that let the Orrery playout engine
//! run against a **Production** environment (tokio + HTTP) and a
//! **Simulation** environment (virtual clock + scripted transport).
//!
//! # Core Concept: Intercept Time and I/O
//!
//! Everything that makes playback non-deterministic goes through a trait:
//! - Time (`now()`, `sleep()`) via [`OrreryContext`]
//! - The snapshot source (`open()`, `close()`, `fetch()`, `init_run()`) via
//!   [`SnapshotTransport`]
//!
//! The controller never owns a socket or reads a system clock directly, so
//! the reconnect state machine and the render clock can be driven tick by
//! tick from a test harness.
//!
//! # Example
//!
//! ```ignore
//! use orrery_env::{OrreryContext, SnapshotTransport, stream_channel};
//!
//! async fn pump<Ctx: OrreryContext, T: SnapshotTransport>(ctx: &Ctx, transport: &T) {
//!     let (sink, mut events) = stream_channel();
//!     let handle = transport.open(sink).unwrap();
//!     loop {
//!         tokio::select! {
//!             Some((from, event)) = events.recv() => handle_event(from, event),
//!             _ = ctx.sleep(Duration::from_millis(8)) => tick(ctx.now()),
//!         }
//!     }
//! }
//! ```

mod context;
mod transport;
mod types;
mod error;
mod tokio_impl;

pub use context::OrreryContext;
pub use transport::{stream_channel, SnapshotTransport, StreamReceiver, StreamSink};
pub use types::{StreamEvent, StreamHandle};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
