//! Snapshot transport abstraction for the Orrery playout engine.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::EnvError;
use crate::types::{StreamEvent, StreamHandle};

/// Sending half of the channel a transport reports stream events on.
pub type StreamSink = mpsc::UnboundedSender<(StreamHandle, StreamEvent)>;

/// Receiving half, drained by the runtime loop.
pub type StreamReceiver = mpsc::UnboundedReceiver<(StreamHandle, StreamEvent)>;

/// Creates the event channel shared by a transport and its consumer.
pub fn stream_channel() -> (StreamSink, StreamReceiver) {
    mpsc::unbounded_channel()
}

/// Abstraction for the remote snapshot service.
///
/// # Implementations
///
/// - **Production**: HTTP (`GET /stream` as server-sent events, `GET /data`,
///   `POST /init`)
/// - **Simulation**: scripted, fault-injecting fake
///
/// # Event Flow
///
/// ```text
/// Service                 Transport                     Runtime loop
///   |                         |                              |
///   |<-- open(sink) ----------|                              |
///   |-- snapshot json ------->|-- (handle, Message) -------->|
///   |-- connection reset ---->|-- (handle, Error) ---------->|
///   |                         |<-- close(handle) ------------|
/// ```
#[async_trait]
pub trait SnapshotTransport: Send + Sync + 'static {
    /// Opens a push connection that reports on `sink`.
    ///
    /// Returns as soon as the connection attempt is under way; the outcome
    /// arrives on the sink tagged with the returned handle.
    ///
    /// # Returns
    /// * `Ok(handle)` - The attempt has started
    /// * `Err(EnvError)` - The attempt could not even be started
    fn open(&self, sink: StreamSink) -> Result<StreamHandle, EnvError>;
    
    /// Releases the connection behind `handle`.
    ///
    /// Closing an unknown or already closed handle is a no-op. No events for
    /// `handle` are guaranteed after this returns, but consumers must still
    /// tolerate late ones.
    fn close(&self, handle: StreamHandle);
    
    /// Fetches up to `count` snapshots in one request.
    ///
    /// # Returns
    /// The raw response body (a JSON array of snapshots).
    async fn fetch(&self, count: usize) -> Result<String, EnvError>;
    
    /// Starts a new simulation run server-side.
    ///
    /// # Arguments
    /// * `payload` - JSON array of the selected body descriptors
    async fn init_run(&self, payload: String) -> Result<(), EnvError>;
}
