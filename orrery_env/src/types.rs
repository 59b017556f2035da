//! Common types for the Orrery environment abstraction.

use serde::{Deserialize, Serialize};

/// Identifier of one opened push connection.
///
/// Handles are never reused within a transport, so an event tagged with a
/// stale handle can always be told apart from the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamHandle(pub u64);

impl StreamHandle {
    /// Returns the raw handle number.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Something that happened on an open push connection.
///
/// The payload of a message is opaque text; decoding it into a snapshot is
/// the playout engine's job, not the transport's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// The connection is established and the server accepted the request
    Opened,
    
    /// One complete message (one encoded snapshot)
    Message(String),
    
    /// Transport-level failure; the connection is unusable
    Error(String),
    
    /// The server ended the stream cleanly
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_handle_display() {
        assert_eq!(StreamHandle(7).to_string(), "stream#7");
        assert_eq!(StreamHandle(7).id(), 7);
    }
}
