//! Status transition policy and the mutation applied on every status change.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::traits::{Session, SessionError, SessionStatus};

/// Which status changes the store accepts.
///
/// `Permissive` accepts any status from the fixed enumeration regardless of
/// the current one (so `completed -> pending` is allowed). `Strict` only
/// accepts moves along the lifecycle graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    pub fn allows(self, from: SessionStatus, to: SessionStatus) -> bool {
        match self {
            Self::Permissive => true,
            Self::Strict => from == to || lifecycle_edge(from, to),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "permissive" => Some(Self::Permissive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

fn lifecycle_edge(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::{Completed, Failed, Paused, Pending, Running};

    matches!(
        (from, to),
        (Pending, Running | Failed)
            | (Running, Paused | Completed | Failed)
            | (Paused, Running | Completed | Failed)
    )
}

/// Move `session` to `next`, stamping `update_time` and, for `Completed`,
/// `end_time` if it is not already set. `end_time` is never cleared.
pub fn apply_status(
    session: &mut Session,
    next: SessionStatus,
    policy: TransitionPolicy,
    now: DateTime<Utc>,
) -> Result<(), SessionError> {
    if !policy.allows(session.status, next) {
        return Err(SessionError::InvalidTransition {
            from: session.status,
            to: next,
        });
    }

    session.status = next;
    session.update_time = now.max(session.start_time);

    if next == SessionStatus::Completed && session.end_time.is_none() {
        session.end_time = Some(session.update_time);
    }

    Ok(())
}
