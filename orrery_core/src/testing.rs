//! In-crate fakes for unit tests.

use async_trait::async_trait;
use orrery_env::{EnvError, OrreryContext, SnapshotTransport, StreamHandle, StreamSink};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Hand-driven clock. `sleep` advances it instead of waiting.
#[derive(Default)]
pub struct ManualContext {
    now: Mutex<Duration>,
}

impl ManualContext {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

#[async_trait]
impl OrreryContext for ManualContext {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    opened: Vec<StreamHandle>,
    closed: Vec<StreamHandle>,
    fail_opens: usize,
    batches: VecDeque<Result<String, String>>,
    fetch_requests: Vec<usize>,
    init_payloads: Vec<String>,
}

/// Records every call; batches are served from a queue.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn opened(&self) -> Vec<StreamHandle> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> Vec<StreamHandle> {
        self.state.lock().unwrap().closed.clone()
    }

    /// Opened and not yet closed.
    pub fn live(&self) -> Vec<StreamHandle> {
        let state = self.state.lock().unwrap();
        state
            .opened
            .iter()
            .filter(|h| !state.closed.contains(h))
            .copied()
            .collect()
    }

    pub fn fail_next_opens(&self, n: usize) {
        self.state.lock().unwrap().fail_opens = n;
    }

    pub fn push_batch(&self, body: &str) {
        self.state.lock().unwrap().batches.push_back(Ok(body.to_string()));
    }

    pub fn push_fetch_error(&self, reason: &str) {
        self.state.lock().unwrap().batches.push_back(Err(reason.to_string()));
    }

    pub fn fetch_requests(&self) -> Vec<usize> {
        self.state.lock().unwrap().fetch_requests.clone()
    }

    pub fn init_payloads(&self) -> Vec<String> {
        self.state.lock().unwrap().init_payloads.clone()
    }
}

#[async_trait]
impl SnapshotTransport for FakeTransport {
    fn open(&self, _sink: StreamSink) -> Result<StreamHandle, EnvError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(EnvError::transport("connection refused"));
        }
        state.next_id += 1;
        let handle = StreamHandle(state.next_id);
        state.opened.push(handle);
        Ok(handle)
    }

    fn close(&self, handle: StreamHandle) {
        self.state.lock().unwrap().closed.push(handle);
    }

    async fn fetch(&self, count: usize) -> Result<String, EnvError> {
        let mut state = self.state.lock().unwrap();
        state.fetch_requests.push(count);
        match state.batches.pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(reason)) => Err(EnvError::transport(reason)),
            None => Ok("[]".to_string()),
        }
    }

    async fn init_run(&self, payload: String) -> Result<(), EnvError> {
        self.state.lock().unwrap().init_payloads.push(payload);
        Ok(())
    }
}
