//! Incremental server-sent events decoder.
//!
//! Only `data:` fields matter here; every dispatched event is one snapshot
//! payload. Lines may end in LF, CRLF or a bare CR.

use thiserror::Error;

/// Largest line or event accepted before the stream is given up on.
pub const MAX_EVENT_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SseError {
    #[error("Event stream exceeded {limit} bytes without completing an event")]
    Oversized { limit: usize },
}

/// Splits a byte stream into event payloads.
#[derive(Debug)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
    /// Last line ended in CR at a chunk boundary; a leading LF belongs to it
    after_cr: bool,
    limit: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_EVENT_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            data: Vec::new(),
            data_len: 0,
            after_cr: false,
            limit,
        }
    }

    /// Consumes one chunk and returns every event it completed.
    ///
    /// Chunks may end anywhere, including inside a multi-byte character or
    /// between the CR and LF of one line ending. Fails once an unfinished
    /// line or event grows past the limit; the decoder is empty afterwards.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Result<Vec<String>, SseError> {
        if self.after_cr && !chunk.is_empty() {
            self.after_cr = false;
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
        }
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let cr = self.pending[end] == b'\r';
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            if cr {
                match self.pending.first() {
                    Some(b'\n') => {
                        self.pending.remove(0);
                    }
                    Some(_) => {}
                    None => self.after_cr = true,
                }
            }
            let line = String::from_utf8_lossy(&raw[..end]);
            if let Some(event) = self.line(&line) {
                events.push(event);
            }
        }

        if self.pending.len() > self.limit || self.data_len > self.limit {
            self.pending.clear();
            self.data.clear();
            self.data_len = 0;
            return Err(SseError::Oversized { limit: self.limit });
        }
        Ok(events)
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let event = self.data.join("\n");
            self.data.clear();
            self.data_len = 0;
            return Some(event);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_len += value.len();
            self.data.push(value.to_string());
        }
        None
    }
}
