use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::lifecycle::{apply_status, TransitionPolicy};
use super::payload::{IntegrationPayload, SessionDetails};
use super::traits::{Session, SessionError, SessionStatus, SessionStorage};
use crate::catalog::Catalog;
use crate::infra::BackgroundQueue;

struct Entry {
    session: Session,
    seq: u64,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    next_seq: u64,
    generation: u64,
}

impl State {
    fn insert(&mut self, session: Session) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(session.id.clone(), Entry { session, seq });
    }

    /// Bump the generation and capture the collection in insertion order.
    fn commit(&mut self) -> Snapshot {
        self.generation += 1;
        self.snapshot()
    }

    fn snapshot(&self) -> Snapshot {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        Snapshot {
            generation: self.generation,
            sessions: entries.into_iter().map(|e| e.session.clone()).collect(),
        }
    }

    /// Newest start time first; equal start times by newest insertion.
    fn ordered(&self) -> Vec<Session> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            b.session
                .start_time
                .cmp(&a.session.start_time)
                .then(b.seq.cmp(&a.seq))
        });
        entries.into_iter().map(|e| e.session.clone()).collect()
    }
}

struct Snapshot {
    generation: u64,
    sessions: Vec<Session>,
}

/// Serializes writes to storage and refuses to go backwards.
struct SnapshotWriter {
    storage: Arc<dyn SessionStorage>,
    written: tokio::sync::Mutex<u64>,
}

impl SnapshotWriter {
    async fn write(&self, snapshot: Snapshot) -> anyhow::Result<()> {
        let mut written = self.written.lock().await;
        if snapshot.generation <= *written {
            tracing::debug!(
                generation = snapshot.generation,
                written = *written,
                "skipping stale session snapshot"
            );
            return Ok(());
        }

        self.storage.save(&snapshot.sessions).await?;
        *written = snapshot.generation;
        tracing::debug!(
            count = snapshot.sessions.len(),
            location = %self.storage.location(),
            "sessions saved"
        );
        Ok(())
    }
}

/// The authoritative collection of training sessions.
///
/// Reads run concurrently; mutations are serialized by one writer lock.
/// Every mutation captures a snapshot of the whole collection while still
/// holding that lock and hands it to the storage backend after releasing
/// it, so the persisted file always equals some state the collection
/// actually passed through.
pub struct SessionStore {
    state: RwLock<State>,
    writer: Arc<SnapshotWriter>,
    catalog: Catalog,
    policy: TransitionPolicy,
    queue: Arc<BackgroundQueue>,
}

impl SessionStore {
    /// Load the persisted collection and build a store around it.
    ///
    /// Fails if the backend cannot be read or parsed. Duplicate ids in the
    /// persisted data keep their first occurrence.
    pub async fn open(
        storage: Arc<dyn SessionStorage>,
        catalog: Catalog,
        policy: TransitionPolicy,
        queue: Arc<BackgroundQueue>,
    ) -> anyhow::Result<Self> {
        let loaded = storage.load().await?;
        let mut state = State::default();
        for session in loaded {
            if state.entries.contains_key(&session.id) {
                tracing::warn!(session_id = %session.id, "duplicate session id in storage; keeping first");
                continue;
            }
            state.insert(session);
        }

        tracing::info!(
            count = state.entries.len(),
            backend = storage.name(),
            location = %storage.location(),
            "sessions loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            writer: Arc::new(SnapshotWriter {
                storage,
                written: tokio::sync::Mutex::new(0),
            }),
            catalog,
            policy,
            queue,
        })
    }

    /// Create a `Pending` session and persist before returning.
    ///
    /// References are not checked against the catalog. On a storage fault
    /// the session stays in memory and the fault is returned.
    pub async fn create(
        &self,
        scenario_id: &str,
        avatar_id: &str,
        observer_id: &str,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();
        let (session, snapshot) = {
            let mut state = self.state.write();
            let id = loop {
                let candidate = new_session_id();
                if !state.entries.contains_key(&candidate) {
                    break candidate;
                }
            };
            let session = Session {
                id,
                scenario_id: scenario_id.to_string(),
                avatar_id: avatar_id.to_string(),
                observer_id: observer_id.to_string(),
                status: SessionStatus::Pending,
                start_time: now,
                end_time: None,
                update_time: now,
                score: None,
                notes: None,
            };
            state.insert(session.clone());
            (session, state.commit())
        };

        tracing::info!(
            session_id = %session.id,
            scenario_id,
            avatar_id,
            observer_id,
            "session created"
        );
        self.persist(snapshot).await?;
        Ok(session)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Session, SessionError> {
        self.state
            .read()
            .entries
            .get(id)
            .map(|e| e.session.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Every session, most recently started first.
    pub fn get_all(&self) -> Vec<Session> {
        self.state.read().ordered()
    }

    /// The first `n` sessions of [`get_all`](Self::get_all).
    pub fn get_recent(&self, n: usize) -> Vec<Session> {
        let mut sessions = self.get_all();
        sessions.truncate(n);
        sessions
    }

    /// Move a session to `status` and persist before returning.
    ///
    /// Unknown ids and rejected transitions leave the store and the
    /// storage untouched.
    pub async fn update_status(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> Result<Session, SessionError> {
        self.transition(id, None, status)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Like [`update_status`](Self::update_status), but only while the
    /// session is still in `expected`. Returns `Ok(None)` without writing
    /// when it has already moved on.
    pub async fn advance(
        &self,
        id: &str,
        expected: SessionStatus,
        status: SessionStatus,
    ) -> Result<Option<Session>, SessionError> {
        self.transition(id, Some(expected), status).await
    }

    async fn transition(
        &self,
        id: &str,
        expected: Option<SessionStatus>,
        status: SessionStatus,
    ) -> Result<Option<Session>, SessionError> {
        let now = Utc::now();
        let (session, previous, snapshot) = {
            let mut state = self.state.write();
            let entry = state
                .entries
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            let previous = entry.session.status;
            if expected.is_some_and(|expected| expected != previous) {
                return Ok(None);
            }
            apply_status(&mut entry.session, status, self.policy, now)?;
            let session = entry.session.clone();
            (session, previous, state.commit())
        };

        tracing::info!(
            session_id = id,
            from = %previous,
            to = %status,
            "session status updated"
        );
        self.persist(snapshot).await?;
        Ok(Some(session))
    }

    /// Remove a session. The removal is persisted by a background job whose
    /// failures are only logged.
    pub fn delete(&self, id: &str) -> Result<Session, SessionError> {
        let (removed, snapshot) = {
            let mut state = self.state.write();
            let removed = state
                .entries
                .remove(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            (removed.session, state.commit())
        };

        tracing::info!(session_id = id, "session deleted");

        let writer = Arc::clone(&self.writer);
        let session_id = id.to_string();
        let queued = self.queue.spawn("persist-delete", async move {
            if let Err(e) = writer.write(snapshot).await {
                tracing::error!(session_id = %session_id, "failed to persist session deletion: {e:#}");
            }
        });
        if !queued {
            tracing::warn!(session_id = id, "deletion not persisted until next flush");
        }

        Ok(removed)
    }

    /// Join a session with its records and serialize the result.
    pub fn build_integration_payload(&self, id: &str) -> Result<Vec<u8>, SessionError> {
        Ok(self.integration_payload(id)?.to_bytes()?)
    }

    pub fn integration_payload(&self, id: &str) -> Result<IntegrationPayload, SessionError> {
        let session = self.get_by_id(id)?;
        Ok(IntegrationPayload::build(&self.catalog, &session, Utc::now()))
    }

    pub fn session_details(&self, id: &str) -> Result<SessionDetails, SessionError> {
        let session = self.get_by_id(id)?;
        Ok(SessionDetails::build(&self.catalog, session, Utc::now()))
    }

    /// Write the current collection if storage is behind it.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let snapshot = self.state.read().snapshot();
        self.persist(snapshot).await
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Session counts for every status, zeros included.
    pub fn counts_by_status(&self) -> BTreeMap<SessionStatus, usize> {
        let mut counts: BTreeMap<_, _> = SessionStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for entry in self.state.read().entries.values() {
            *counts.entry(entry.session.status).or_default() += 1;
        }
        counts
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn storage_location(&self) -> String {
        self.writer.storage.location()
    }

    async fn persist(&self, snapshot: Snapshot) -> Result<(), SessionError> {
        self.writer.write(snapshot).await.map_err(|e| {
            tracing::error!("failed to persist sessions: {e:#}");
            SessionError::Storage(e)
        })
    }
}

fn new_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4().simple())
}
