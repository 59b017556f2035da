//! Snapshot model - one timestamped sample of every simulated body.
//!
//! Snapshots arrive as JSON text from the push stream (one per message) or
//! from the batch endpoint (an array). Decoding is strict about the fields
//! interpolation depends on and lenient about everything else, so extra
//! server fields such as `z` are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Render state of a single body at one simulation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// Display name, also the trail key
    pub label: String,

    /// Position in simulation space
    pub x: f64,
    pub y: f64,

    /// Marker radius at zoom 1.0
    pub size: f64,

    /// Marker colour as sent by the server (CSS name or `#rrggbb`)
    pub color: String,
}

impl BodyState {
    /// Creates a body state.
    pub fn new(label: &str, x: f64, y: f64, size: f64, color: &str) -> Self {
        Self {
            label: label.to_string(),
            x,
            y,
            size,
            color: color.to_string(),
        }
    }
}

/// One timestamped sample of all bodies.
///
/// Within a run, consecutive snapshots list the same bodies in the same
/// order; index `k` always refers to the same entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time of the sample
    pub timestamp: f64,

    /// Bodies in run order
    pub bodies: Vec<BodyState>,
}

/// Errors raised while decoding or validating snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Batch is not a JSON array")]
    NotAnArray,

    #[error("Non-finite timestamp: {0}")]
    NonFiniteTimestamp(f64),

    #[error("Non-finite position for body {index} ({label})")]
    NonFinitePosition { index: usize, label: String },
}

/// Result of decoding a batch response.
///
/// Elements that fail to decode are counted and skipped so one bad entry
/// cannot discard the rest of a prefill.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub snapshots: Vec<Snapshot>,
    pub rejected: usize,
}

impl Snapshot {
    /// Creates a snapshot.
    pub fn new(timestamp: f64, bodies: Vec<BodyState>) -> Self {
        Self { timestamp, bodies }
    }

    /// Decodes and validates one stream message.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Decodes a batch response (`GET /data`).
    pub fn batch_from_json(text: &str) -> Result<DecodedBatch, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Array(items) = value else {
            return Err(SnapshotError::NotAnArray);
        };

        let mut batch = DecodedBatch::default();
        for item in items {
            let decoded = serde_json::from_value::<Snapshot>(item)
                .map_err(SnapshotError::from)
                .and_then(|s| s.validate().map(|_| s));
            match decoded {
                Ok(snapshot) => batch.snapshots.push(snapshot),
                Err(_) => batch.rejected += 1,
            }
        }
        Ok(batch)
    }

    /// Rejects values that would poison interpolation.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if !self.timestamp.is_finite() {
            return Err(SnapshotError::NonFiniteTimestamp(self.timestamp));
        }
        for (index, body) in self.bodies.iter().enumerate() {
            if !body.x.is_finite() || !body.y.is_finite() {
                return Err(SnapshotError::NonFinitePosition {
                    index,
                    label: body.label.clone(),
                });
            }
        }
        Ok(())
    }

    /// Number of bodies in this sample.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
