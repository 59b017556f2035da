//! HTTP implementation of the snapshot transport.
//!
//! - `GET /stream` is read as server-sent events by one task per handle
//! - `GET /data?count=N` serves prefill batches
//! - `POST /init` starts a new run

use async_trait::async_trait;
use futures_util::StreamExt;
use orrery_env::{EnvError, SnapshotTransport, StreamEvent, StreamHandle, StreamSink};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sse::SseDecoder;

/// Limit for batch and init requests; streams run unbounded.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot service reached over HTTP.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    next_id: AtomicU64,
    readers: Mutex<HashMap<StreamHandle, JoinHandle<()>>>,
}

impl HttpTransport {
    /// Creates a transport for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, EnvError> {
        let client = Client::builder().build().map_err(request_error)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(0),
            readers: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn readers(&self) -> MutexGuard<'_, HashMap<StreamHandle, JoinHandle<()>>> {
        self.readers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        for (_, reader) in self.readers().drain() {
            reader.abort();
        }
    }
}

#[async_trait]
impl SnapshotTransport for HttpTransport {
    fn open(&self, sink: StreamSink) -> Result<StreamHandle, EnvError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| EnvError::transport(e.to_string()))?;
        let handle = StreamHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let reader = runtime.spawn(read_stream(self.client.clone(), self.url("/stream"), handle, sink));
        self.readers().insert(handle, reader);
        debug!("{} reading {}/stream", handle, self.base_url);
        Ok(handle)
    }

    fn close(&self, handle: StreamHandle) {
        if let Some(reader) = self.readers().remove(&handle) {
            reader.abort();
        }
    }

    async fn fetch(&self, count: usize) -> Result<String, EnvError> {
        let url = self.url(&format!("/data?count={}", count));
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;
        if !response.status().is_success() {
            return Err(EnvError::status(response.status().as_u16(), url));
        }
        response.text().await.map_err(|e| EnvError::Body(e.to_string()))
    }

    async fn init_run(&self, payload: String) -> Result<(), EnvError> {
        let url = self.url("/init");
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .body(payload)
            .send()
            .await
            .map_err(request_error)?;
        if !response.status().is_success() {
            return Err(EnvError::status(response.status().as_u16(), url));
        }
        Ok(())
    }
}

fn request_error(e: reqwest::Error) -> EnvError {
    if e.is_timeout() {
        EnvError::Timeout(REQUEST_TIMEOUT.as_millis() as u64)
    } else {
        EnvError::transport(e.to_string())
    }
}

/// Forwards one event stream to `sink` until it ends, fails, or the task is
/// aborted.
async fn read_stream(client: Client, url: String, handle: StreamHandle, sink: StreamSink) {
    let report = |event: StreamEvent| sink.send((handle, event)).is_ok();

    let response = match client.get(&url).header(ACCEPT, "text/event-stream").send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            report(StreamEvent::Error(format!("HTTP {} from {}", response.status(), url)));
            return;
        }
        Err(e) => {
            report(StreamEvent::Error(e.to_string()));
            return;
        }
    };
    if !report(StreamEvent::Opened) {
        return;
    }

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => match decoder.feed(&bytes) {
                Ok(payloads) => {
                    for payload in payloads {
                        if !report(StreamEvent::Message(payload)) {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("{} dropped: {}", handle, e);
                    report(StreamEvent::Error(e.to_string()));
                    return;
                }
            },
            Err(e) => {
                warn!("{} read failed: {}", handle, e);
                report(StreamEvent::Error(e.to_string()));
                return;
            }
        }
    }
    report(StreamEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_env::stream_channel;

    #[test]
    fn test_base_url_normalized() {
        let transport = HttpTransport::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:5000");
        assert_eq!(transport.url("/init"), "http://127.0.0.1:5000/init");
    }

    #[test]
    fn test_open_needs_runtime() {
        let transport = HttpTransport::new("http://127.0.0.1:5000").unwrap();
        let (sink, _events) = stream_channel();
        assert!(transport.open(sink).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_error_on_handle() {
        // port 9 (discard) is not expected to serve HTTP
        let transport = HttpTransport::new("http://127.0.0.1:9").unwrap();
        let (sink, mut events) = stream_channel();

        let handle = transport.open(sink).unwrap();
        let (from, event) = events.recv().await.unwrap();

        assert_eq!(from, handle);
        assert!(matches!(event, StreamEvent::Error(_)));
        transport.close(handle);
        transport.close(handle);
    }

    #[tokio::test]
    async fn test_handles_are_distinct() {
        let transport = HttpTransport::new("http://127.0.0.1:9").unwrap();
        let (sink, _events) = stream_channel();

        let a = transport.open(sink.clone()).unwrap();
        let b = transport.open(sink).unwrap();

        assert_ne!(a, b);
        transport.close(a);
        transport.close(b);
        assert!(transport.readers().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_an_error() {
        let transport = HttpTransport::new("http://127.0.0.1:9").unwrap();
        assert!(transport.fetch(10).await.is_err());
        assert!(transport.init_run("[]".to_string()).await.is_err());
    }
}
