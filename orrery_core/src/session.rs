//! Stream Session Manager - lifecycle of the push connection.
//!
//! ```text
//!                 start()                 Opened / first Message
//! Disconnected ───────────► Connecting ───────────────────────► Streaming
//!      ▲  ▲                     │                                   │
//!      │  │  reconnect due      │ Error / Closed / open() failed    │
//!      │  └─────────────────────┤◄──────────────────────────────────┘
//!      │    (intent = Playing)  │
//!      └── stop() ──────────────┘  (any state; cancels pending reconnect)
//! ```
//!
//! The reconnect timer is a deadline on the caller's monotonic clock, checked
//! by [`StreamSessionManager::poll_reconnect`]. Every transport event carries
//! the handle it came from; events for anything but the live handle are
//! counted and dropped.

use orrery_env::{SnapshotTransport, StreamEvent, StreamHandle, StreamSink};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection state of the push stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Streaming,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
        };
        write!(f, "{}", name)
    }
}

/// What the caller wants the session to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayIntent {
    Playing,
    Stopped,
}

/// Reconnect policy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed wait between a failure and the next attempt
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Counters kept for logging and harness assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Calls to `transport.open`
    pub connect_attempts: u64,

    /// Reconnects put on the timer
    pub reconnects_scheduled: u64,

    /// Messages accepted from the live handle
    pub messages: u64,

    /// Errors, closures and failed opens on the live handle
    pub failures: u64,

    /// Events ignored because their handle was no longer live
    pub stale_events: u64,
}

/// Owns the push connection and its reconnect policy.
pub struct StreamSessionManager<T: SnapshotTransport> {
    transport: Arc<T>,
    sink: StreamSink,
    config: SessionConfig,
    state: SessionState,
    intent: PlayIntent,
    live: Option<StreamHandle>,
    reconnect_at: Option<Duration>,
    stats: SessionStats,
}

impl<T: SnapshotTransport> StreamSessionManager<T> {
    /// Creates a disconnected, stopped session reporting on `sink`.
    pub fn new(transport: Arc<T>, sink: StreamSink, config: SessionConfig) -> Self {
        Self {
            transport,
            sink,
            config,
            state: SessionState::Disconnected,
            intent: PlayIntent::Stopped,
            live: None,
            reconnect_at: None,
            stats: SessionStats::default(),
        }
    }

    /// Declares the intent to play and connects unless already connecting
    /// or streaming.
    pub fn start(&mut self, now: Duration) {
        self.intent = PlayIntent::Playing;
        if self.state != SessionState::Disconnected {
            debug!("start ignored, session already {}", self.state);
            return;
        }
        self.reconnect_at = None;
        self.connect(now);
    }

    /// Declares the intent to stop: releases the connection and cancels any
    /// pending reconnect. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.intent = PlayIntent::Stopped;
        self.reconnect_at = None;
        self.release();
        self.state = SessionState::Disconnected;
    }

    /// Handles one transport event.
    ///
    /// Returns the message payload when it should be offered to the buffer.
    pub fn on_event(&mut self, handle: StreamHandle, event: StreamEvent, now: Duration) -> Option<String> {
        if self.live != Some(handle) {
            self.stats.stale_events += 1;
            debug!("ignoring {:?} from stale {}", event, handle);
            return None;
        }

        match event {
            StreamEvent::Opened => {
                self.mark_streaming(handle);
                None
            }
            StreamEvent::Message(payload) => {
                self.mark_streaming(handle);
                self.stats.messages += 1;
                Some(payload)
            }
            StreamEvent::Error(reason) => {
                self.fail(now, &reason);
                None
            }
            StreamEvent::Closed => {
                self.fail(now, "closed by server");
                None
            }
        }
    }

    /// Fires the reconnect timer if it is due. Returns true when a new
    /// connection attempt was started.
    pub fn poll_reconnect(&mut self, now: Duration) -> bool {
        match self.reconnect_at {
            Some(at) if now >= at => {
                self.reconnect_at = None;
                if self.intent == PlayIntent::Playing && self.state == SessionState::Disconnected {
                    info!("Reconnecting stream");
                    self.connect(now);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn intent(&self) -> PlayIntent {
        self.intent
    }

    /// Handle of the connection currently owned, if any.
    pub fn live_handle(&self) -> Option<StreamHandle> {
        self.live
    }

    /// Deadline of the pending reconnect, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Duration> {
        self.reconnect_at
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn connect(&mut self, now: Duration) {
        self.stats.connect_attempts += 1;
        self.state = SessionState::Connecting;
        match self.transport.open(self.sink.clone()) {
            Ok(handle) => {
                debug!("opening {}", handle);
                self.live = Some(handle);
            }
            Err(e) => {
                self.fail(now, &e.to_string());
            }
        }
    }

    fn mark_streaming(&mut self, handle: StreamHandle) {
        if self.state == SessionState::Connecting {
            info!("Stream connected ({})", handle);
            self.state = SessionState::Streaming;
        }
    }

    fn fail(&mut self, now: Duration, reason: &str) {
        self.stats.failures += 1;
        self.release();
        self.state = SessionState::Disconnected;

        if self.intent == PlayIntent::Playing {
            self.reconnect_at = Some(now + self.config.reconnect_delay);
            self.stats.reconnects_scheduled += 1;
            warn!(
                "Stream disconnected ({}), reconnecting in {:?}",
                reason, self.config.reconnect_delay
            );
        } else {
            debug!("stream ended while stopped ({}), not reconnecting", reason);
        }
    }

    fn release(&mut self) {
        if let Some(handle) = self.live.take() {
            debug!("closing {}", handle);
            self.transport.close(handle);
        }
    }
}

impl<T: SnapshotTransport> Drop for StreamSessionManager<T> {
    fn drop(&mut self) {
        self.release();
    }
}
