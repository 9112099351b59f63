//! Session records, lifecycle states, errors and the durable storage trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a training session.
///
/// `Pending` is initial; `Completed` and `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Paused,
        Self::Completed,
        Self::Failed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| SessionError::InvalidInput(format!("unknown session status: {s:?}")))
    }
}

/// One training run referencing a scenario, an avatar and an observer profile.
///
/// The three references are stored as plain ids; they are resolved against
/// the catalog on every join and may dangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub scenario_id: String,
    pub avatar_id: String,
    pub observer_id: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub update_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Session {
    /// Elapsed time of the run: until `end_time` once completed, until `now` otherwise.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.end_time.unwrap_or(now) - self.start_time
    }

    /// `"1h 2m 3s"`, or `"2m 3s"` under an hour.
    pub fn formatted_duration(&self, now: DateTime<Utc>) -> String {
        let total = self.duration(now).num_seconds().max(0);
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        if hours > 0 {
            format!("{hours}h {minutes}m {seconds}s")
        } else {
            format!("{minutes}m {seconds}s")
        }
    }
}

/// Errors surfaced by session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
    #[error("session storage fault: {0:#}")]
    Storage(#[source] anyhow::Error),
    #[error("failed to encode integration payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable backing for the full session collection.
///
/// Every save rewrites the whole collection; there is no incremental log.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load every persisted session, in persisted order.
    async fn load(&self) -> anyhow::Result<Vec<Session>>;

    /// Replace the persisted collection with `sessions`.
    async fn save(&self, sessions: &[Session]) -> anyhow::Result<()>;

    /// Human-readable location of the data (file path or `memory`).
    fn location(&self) -> String;

    /// The name of this storage implementation.
    fn name(&self) -> &str;
}
