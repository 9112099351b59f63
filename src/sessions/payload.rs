//! Joins between a session and the reference records it points at.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::traits::{Session, SessionStatus};
use crate::catalog::{Avatar, Catalog, CatalogRecord, Observer, ReferenceCollection, Scenario};

/// A session reference that no longer resolves in its collection.
///
/// Reported by joins and logged; never returned as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub kind: &'static str,
    pub reference_id: String,
}

/// The joined representation of a session delivered to the VR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPayload {
    pub session_id: String,
    pub status: SessionStatus,
    pub scenario: Scenario,
    pub avatar: Avatar,
    pub observer: Observer,
    /// When the payload was built, not when the session last changed.
    pub timestamp: String,
}

/// A session together with whichever of its records resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    pub session: Session,
    pub scenario: Option<Scenario>,
    pub avatar: Option<Avatar>,
    pub observer: Option<Observer>,
    pub duration: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dangling: Vec<DanglingReference>,
}

struct Resolved {
    scenario: Option<Scenario>,
    avatar: Option<Avatar>,
    observer: Option<Observer>,
    dangling: Vec<DanglingReference>,
}

fn lookup<T: CatalogRecord>(
    collection: &dyn ReferenceCollection<T>,
    id: &str,
    session_id: &str,
    dangling: &mut Vec<DanglingReference>,
) -> Option<T> {
    let found = collection.get_by_id(id);
    if found.is_none() {
        tracing::warn!(
            session_id,
            kind = T::KIND,
            reference_id = id,
            "session references a missing record"
        );
        dangling.push(DanglingReference {
            kind: T::KIND,
            reference_id: id.to_string(),
        });
    }
    found
}

/// Each collection is read independently; no snapshot spans the three reads.
fn resolve(catalog: &Catalog, session: &Session) -> Resolved {
    let mut dangling = Vec::new();
    let scenario = lookup(
        catalog.scenarios.as_ref(),
        &session.scenario_id,
        &session.id,
        &mut dangling,
    );
    let avatar = lookup(
        catalog.avatars.as_ref(),
        &session.avatar_id,
        &session.id,
        &mut dangling,
    );
    let observer = lookup(
        catalog.observers.as_ref(),
        &session.observer_id,
        &session.id,
        &mut dangling,
    );

    Resolved {
        scenario,
        avatar,
        observer,
        dangling,
    }
}

impl IntegrationPayload {
    /// Join `session` with the catalog. Missing records become zero-value records.
    pub fn build(catalog: &Catalog, session: &Session, now: DateTime<Utc>) -> Self {
        let resolved = resolve(catalog, session);

        Self {
            session_id: session.id.clone(),
            status: session.status,
            scenario: resolved.scenario.unwrap_or_default(),
            avatar: resolved.avatar.unwrap_or_default(),
            observer: resolved.observer.unwrap_or_default(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl SessionDetails {
    pub fn build(catalog: &Catalog, session: Session, now: DateTime<Utc>) -> Self {
        let resolved = resolve(catalog, &session);
        let duration = session.formatted_duration(now);

        Self {
            session,
            scenario: resolved.scenario,
            avatar: resolved.avatar,
            observer: resolved.observer,
            duration,
            dangling: resolved.dangling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::create_catalog;
    use chrono::TimeZone;

    fn session(scenario: &str, avatar: &str, observer: &str) -> Session {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        Session {
            id: "session_join".into(),
            scenario_id: scenario.into(),
            avatar_id: avatar.into(),
            observer_id: observer.into(),
            status: SessionStatus::Running,
            start_time: start,
            end_time: None,
            update_time: start,
            score: None,
            notes: None,
        }
    }

    #[test]
    fn payload_carries_full_records() {
        let catalog = create_catalog();
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 30, 0).unwrap();

        let payload = IntegrationPayload::build(&catalog, &session("1", "2", "1"), now);

        assert_eq!(payload.session_id, "session_join");
        assert_eq!(payload.scenario.name, "Digital Service Assistance");
        assert_eq!(payload.avatar.name, "Customer Support");
        assert_eq!(payload.observer.name, "Sales Coach");
        assert_eq!(payload.timestamp, "2025-05-01T09:30:00Z");
    }

    #[test]
    fn missing_avatar_becomes_zero_value() {
        let catalog = create_catalog();
        let payload = IntegrationPayload::build(&catalog, &session("1", "404", "1"), Utc::now());

        assert_eq!(payload.avatar, Avatar::default());
        assert_eq!(payload.scenario.id, "1");
    }

    #[test]
    fn payload_wire_shape() {
        let catalog = create_catalog();
        let bytes = IntegrationPayload::build(&catalog, &session("2", "1", "2"), Utc::now())
            .to_bytes()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        for key in ["sessionId", "status", "scenario", "avatar", "observer", "timestamp"] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
        assert_eq!(json["status"], "running");
        assert!(json["avatar"].get("PersonalityType").is_some());
        assert_eq!(json["avatar"]["ID"], "1");
        assert_eq!(json["observer"]["Name"], "Conflict Mediator");
    }

    #[test]
    fn details_report_dangling_references() {
        let catalog = create_catalog();
        let details = SessionDetails::build(&catalog, session("nope", "1", "gone"), Utc::now());

        assert!(details.scenario.is_none());
        assert!(details.avatar.is_some());
        assert_eq!(
            details.dangling,
            vec![
                DanglingReference {
                    kind: "scenario",
                    reference_id: "nope".into()
                },
                DanglingReference {
                    kind: "observer",
                    reference_id: "gone".into()
                },
            ]
        );
    }
}
