use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What happens to queued background jobs when the process shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Run every queued job to completion, bounded by the drain timeout.
    #[default]
    Drain,
    /// Abort the in-flight job and discard the rest.
    Drop,
}

impl ShutdownPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drain => "drain",
            Self::Drop => "drop",
        }
    }
}

/// Outcome of a queue shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Jobs that ran to completion over the queue's lifetime.
    pub completed: usize,
    /// Jobs that were queued or in flight and never finished.
    pub dropped: usize,
}
