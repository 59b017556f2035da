//! Simulated snapshot transport with fault injection.
//!
//! Streams are pumped by the harness: [`SimTransport::pump`] delivers every
//! message due at the current virtual time to the streams still open.

use async_trait::async_trait;
use orrery_core::{BodyDescriptor, Snapshot};
use orrery_env::{EnvError, OrreryContext, SnapshotTransport, StreamEvent, StreamHandle, StreamSink};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::context::{lock, SimContext};
use crate::feed::SyntheticFeed;

/// Behaviour of the simulated service.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Stream messages per second of virtual time
    pub message_rate_hz: f64,

    /// Standard deviation of the inter-message gap (ms)
    pub jitter_std_ms: f64,

    /// Delay before the first message of a new stream
    pub connect_latency: Duration,

    /// Probability that two consecutive messages swap places
    pub reorder_prob: f64,

    /// Probability that a payload is damaged
    pub corrupt_prob: f64,

    /// Per-message probability that the server drops the stream
    pub disconnect_prob: f64,

    /// Probability that `open` fails outright
    pub open_failure_prob: f64,

    /// Probability that a batch request fails
    pub fetch_failure_prob: f64,

    /// Report an error for a stream after the client closed it
    pub late_error_on_close: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            message_rate_hz: 30.0,
            jitter_std_ms: 0.0,
            connect_latency: Duration::from_millis(50),
            reorder_prob: 0.0,
            corrupt_prob: 0.0,
            disconnect_prob: 0.0,
            open_failure_prob: 0.0,
            fetch_failure_prob: 0.0,
            late_error_on_close: false,
        }
    }
}

/// What the service did, for scenario assertions.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TransportStats {
    pub opens: u64,
    pub open_failures: u64,
    pub closes: u64,
    pub messages_sent: u64,
    pub corrupt_sent: u64,
    pub reordered: u64,
    pub disconnects_injected: u64,
    pub late_errors: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub inits: u64,

    /// Most streams ever open at once
    pub max_live_streams: usize,
}

struct LiveStream {
    handle: StreamHandle,
    sink: StreamSink,
    next_at: Duration,
    held: Option<String>,

    /// Failed server-side, waiting for the client to close it
    dead: bool,
}

struct TransportState {
    next_id: u64,
    streams: Vec<LiveStream>,
    feed: SyntheticFeed,
    rng: ChaCha8Rng,
    stats: TransportStats,
}

/// Fault-injecting fake of the remote snapshot service.
pub struct SimTransport {
    ctx: Arc<SimContext>,
    faults: FaultConfig,
    state: Mutex<TransportState>,
}

impl SimTransport {
    pub fn new(ctx: Arc<SimContext>, feed: SyntheticFeed, faults: FaultConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(ctx.derive_seed(0x7452_414e));
        Self {
            ctx,
            faults,
            state: Mutex::new(TransportState {
                next_id: 0,
                streams: Vec::new(),
                feed,
                rng,
                stats: TransportStats::default(),
            }),
        }
    }

    /// Delivers every message due at or before `now`. Returns the number of
    /// events sent.
    pub fn pump(&self, now: Duration) -> usize {
        let mut state = lock(&self.state);
        let TransportState {
            streams,
            feed,
            rng,
            stats,
            ..
        } = &mut *state;

        let gap = Duration::from_secs_f64(1.0 / self.faults.message_rate_hz.max(1e-3));
        let jitter = Normal::new(0.0, self.faults.jitter_std_ms.max(0.0)).ok();
        let mut sent = 0;

        for stream in streams.iter_mut().filter(|s| !s.dead) {
            while stream.next_at <= now {
                if rng.gen_bool(self.faults.disconnect_prob) {
                    stats.disconnects_injected += 1;
                    debug!("dropping {} server-side", stream.handle);
                    let _ = stream
                        .sink
                        .send((stream.handle, StreamEvent::Error("connection reset".into())));
                    stream.dead = true;
                    sent += 1;
                    break;
                }

                let message = self.encode(feed.next_snapshot(), rng, stats);
                if stream.held.is_none() && rng.gen_bool(self.faults.reorder_prob) {
                    // sent after its successor
                    stats.reordered += 1;
                    stream.held = Some(message);
                } else {
                    for message in std::iter::once(message).chain(stream.held.take()) {
                        let _ = stream.sink.send((stream.handle, StreamEvent::Message(message)));
                        stats.messages_sent += 1;
                        sent += 1;
                    }
                }

                let delay_ms = jitter.map(|n| n.sample(rng)).unwrap_or(0.0);
                let next = gap.as_secs_f64() + delay_ms / 1000.0;
                stream.next_at += Duration::from_secs_f64(next.max(0.0));
            }
        }

        sent
    }

    /// Streams currently delivering.
    pub fn live_streams(&self) -> usize {
        lock(&self.state).streams.iter().filter(|s| !s.dead).count()
    }

    /// Exact body states the feed holds for simulation time `t`.
    pub fn exact_state(&self, t: f64) -> Vec<orrery_core::BodyState> {
        lock(&self.state).feed.state_at(t)
    }

    pub fn stats(&self) -> TransportStats {
        lock(&self.state).stats
    }

    /// Snapshots the feed has produced for this run.
    pub fn produced(&self) -> u64 {
        lock(&self.state).feed.produced()
    }

    fn encode(&self, snapshot: Snapshot, rng: &mut ChaCha8Rng, stats: &mut TransportStats) -> String {
        let text = serde_json::to_string(&snapshot).unwrap_or_default();
        if !rng.gen_bool(self.faults.corrupt_prob) {
            return text;
        }
        stats.corrupt_sent += 1;
        match rng.gen_range(0..3) {
            0 => text.get(..text.len() / 2).unwrap_or_default().to_string(),
            1 => serde_json::json!({ "bodies": snapshot.bodies }).to_string(),
            _ => serde_json::json!({ "timestamp": snapshot.timestamp, "bodies": "garbled" }).to_string(),
        }
    }
}

#[async_trait]
impl SnapshotTransport for SimTransport {
    fn open(&self, sink: StreamSink) -> Result<StreamHandle, EnvError> {
        let mut state = lock(&self.state);
        if state.rng.gen_bool(self.faults.open_failure_prob) {
            state.stats.open_failures += 1;
            return Err(EnvError::transport("connection refused"));
        }

        state.next_id += 1;
        let handle = StreamHandle(state.next_id);
        let next_at = self.ctx.now() + self.faults.connect_latency;
        state.streams.push(LiveStream {
            handle,
            sink,
            next_at,
            held: None,
            dead: false,
        });
        state.stats.opens += 1;
        let live = state.streams.iter().filter(|s| !s.dead).count();
        state.stats.max_live_streams = state.stats.max_live_streams.max(live);
        Ok(handle)
    }

    fn close(&self, handle: StreamHandle) {
        let mut state = lock(&self.state);
        let Some(index) = state.streams.iter().position(|s| s.handle == handle) else {
            return;
        };
        let stream = state.streams.remove(index);
        state.stats.closes += 1;

        if self.faults.late_error_on_close {
            state.stats.late_errors += 1;
            let _ = stream.sink.send((handle, StreamEvent::Error("aborted".into())));
        }
    }

    async fn fetch(&self, count: usize) -> Result<String, EnvError> {
        let mut state = lock(&self.state);
        state.stats.fetches += 1;
        if state.rng.gen_bool(self.faults.fetch_failure_prob) {
            state.stats.fetch_failures += 1;
            return Err(EnvError::status(503, format!("/data?count={}", count)));
        }

        let batch: Vec<Snapshot> = (0..count).map(|_| state.feed.next_snapshot()).collect();
        serde_json::to_string(&batch).map_err(|e| EnvError::Body(e.to_string()))
    }

    async fn init_run(&self, payload: String) -> Result<(), EnvError> {
        let selection: Vec<BodyDescriptor> =
            serde_json::from_str(&payload).map_err(|e| EnvError::Body(e.to_string()))?;
        let labels: Vec<&str> = selection.iter().map(|b| b.label.as_str()).collect();

        let mut state = lock(&self.state);
        let step = state.feed.sim_step();
        state.feed = SyntheticFeed::for_labels(&labels, step, self.ctx.derive_seed(labels.len() as u64));
        state.stats.inits += 1;
        debug!("run initialized with {:?}", labels);
        Ok(())
    }
}
