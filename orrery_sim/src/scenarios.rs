//! Chaos scenarios for the playout engine.

use std::time::Duration;

use crate::transport::FaultConfig;

/// Available test scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Clean stream at the render rate
    Steady,

    /// Irregular arrival with occasional reordering
    Jitter,

    /// Server drops streams, refuses connections, reports late errors
    FlakyStream,

    /// User toggles play/pause at random
    PauseChurn,

    /// View is hidden and shown at random
    VisibilityChurn,

    /// Damaged payloads on both paths
    CorruptFeed,

    /// Stream delivers far faster than playback consumes
    Backlog,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Steady,
            ScenarioId::Jitter,
            ScenarioId::FlakyStream,
            ScenarioId::PauseChurn,
            ScenarioId::VisibilityChurn,
            ScenarioId::CorruptFeed,
            ScenarioId::Backlog,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "steady",
            ScenarioId::Jitter => "jitter",
            ScenarioId::FlakyStream => "flaky_stream",
            ScenarioId::PauseChurn => "pause_churn",
            ScenarioId::VisibilityChurn => "visibility_churn",
            ScenarioId::CorruptFeed => "corrupt_feed",
            ScenarioId::Backlog => "backlog",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "30 msg/s stream, no faults: continuous frames, no reconnects",
            ScenarioId::Jitter => "20ms arrival jitter and 10% reordering: order kept, frames continue",
            ScenarioId::FlakyStream => "Dropped streams, refused opens, late errors: one live stream, endless retries",
            ScenarioId::PauseChurn => "Random play/pause: no stream and no frames while paused",
            ScenarioId::VisibilityChurn => "Random hide/show: refill on return, no stream while hidden",
            ScenarioId::CorruptFeed => "10% damaged payloads and failing fetches: dropped, never fatal",
            ScenarioId::Backlog => "120 msg/s into a 30 fps consumer: buffer stays bounded",
        }
    }

    /// Service behaviour for this scenario.
    pub fn faults(&self) -> FaultConfig {
        let base = FaultConfig::default();
        match self {
            ScenarioId::Steady | ScenarioId::PauseChurn | ScenarioId::VisibilityChurn => base,
            ScenarioId::Jitter => FaultConfig {
                jitter_std_ms: 20.0,
                reorder_prob: 0.1,
                ..base
            },
            ScenarioId::FlakyStream => FaultConfig {
                disconnect_prob: 0.02,
                open_failure_prob: 0.2,
                late_error_on_close: true,
                connect_latency: Duration::from_millis(150),
                ..base
            },
            ScenarioId::CorruptFeed => FaultConfig {
                corrupt_prob: 0.1,
                fetch_failure_prob: 0.3,
                ..base
            },
            ScenarioId::Backlog => FaultConfig {
                message_rate_hz: 120.0,
                ..base
            },
        }
    }

    /// Interval range between scripted user actions, if the scenario has any.
    pub fn churn(&self) -> Option<(Duration, Duration)> {
        match self {
            ScenarioId::PauseChurn => Some((Duration::from_millis(150), Duration::from_millis(900))),
            ScenarioId::VisibilityChurn => Some((Duration::from_millis(300), Duration::from_millis(1500))),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady" => Ok(ScenarioId::Steady),
            "jitter" => Ok(ScenarioId::Jitter),
            "flaky_stream" | "flaky" => Ok(ScenarioId::FlakyStream),
            "pause_churn" | "pause" => Ok(ScenarioId::PauseChurn),
            "visibility_churn" | "visibility" => Ok(ScenarioId::VisibilityChurn),
            "corrupt_feed" | "corrupt" => Ok(ScenarioId::CorruptFeed),
            "backlog" => Ok(ScenarioId::Backlog),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
