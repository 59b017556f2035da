//! Error types for the Orrery environment abstraction.

use thiserror::Error;

/// Errors that can occur at the transport / environment seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// Connection could not be established or broke mid-flight
    #[error("Transport error: {0}")]
    Transport(String),
    
    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    
    /// A response body could not be read
    #[error("Body error: {0}")]
    Body(String),
    
    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
    
    /// Creates a status error.
    pub fn status(status: u16, url: impl std::fmt::Display) -> Self {
        Self::Status {
            status,
            url: url.to_string(),
        }
    }
}
