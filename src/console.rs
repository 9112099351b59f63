//! Application context: wires the session store, the catalog, the engine
//! notifier and the background queue, and owns the caller-facing flows.

use anyhow::Context;
use std::sync::Arc;

use crate::catalog::{create_catalog, Catalog};
use crate::config::{Config, DispatchConfig};
use crate::engine::{create_notifier, EngineNotifier};
use crate::infra::{create_background_queue, BackgroundQueue, ShutdownReport};
use crate::sessions::{
    create_storage, IntegrationPayload, Session, SessionDetails, SessionError, SessionStatus,
    SessionStore,
};

/// One explicitly constructed console instance.
///
/// Created at process start and torn down with [`shutdown`](Self::shutdown),
/// which settles background jobs and flushes the session store.
pub struct TrainingConsole {
    store: Arc<SessionStore>,
    notifier: Arc<dyn EngineNotifier>,
    queue: Arc<BackgroundQueue>,
    dispatch: DispatchConfig,
    recent_limit: usize,
}

impl TrainingConsole {
    pub fn new(
        store: Arc<SessionStore>,
        notifier: Arc<dyn EngineNotifier>,
        queue: Arc<BackgroundQueue>,
        dispatch: DispatchConfig,
        recent_limit: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            queue,
            dispatch,
            recent_limit,
        }
    }

    /// Build every component from `config`. Requires a Tokio runtime.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::with_catalog(config, create_catalog()).await
    }

    pub async fn with_catalog(config: &Config, catalog: Catalog) -> anyhow::Result<Self> {
        let storage = create_storage(&config.storage.backend, config.sessions_file_path())?;
        let notifier = create_notifier(&config.engine)?;
        let queue = create_background_queue();
        let store = SessionStore::open(
            storage,
            catalog,
            config.sessions.transition_policy,
            Arc::clone(&queue),
        )
        .await
        .context("Failed to open session store")?;

        Ok(Self::new(
            Arc::new(store),
            notifier,
            queue,
            config.dispatch.clone(),
            config.sessions.recent_limit,
        ))
    }

    /// Validate the three references, create a `Pending` session and queue
    /// the job that starts it and notifies the engine.
    pub async fn start_session(
        &self,
        scenario_id: &str,
        avatar_id: &str,
        observer_id: &str,
    ) -> Result<Session, SessionError> {
        let scenario_id = required("scenarioId", scenario_id)?;
        let avatar_id = required("avatarId", avatar_id)?;
        let observer_id = required("observerId", observer_id)?;

        let session = self
            .store
            .create(scenario_id, avatar_id, observer_id)
            .await?;

        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let session_id = session.id.clone();
        self.queue.spawn(format!("start:{session_id}"), async move {
            run_start_job(&store, notifier.as_ref(), &session_id).await;
        });

        Ok(session)
    }

    /// Parse `label`, apply it, and queue an engine notification.
    pub async fn change_status(&self, id: &str, label: &str) -> Result<Session, SessionError> {
        let id = required("id", id)?;
        let status: SessionStatus = label.parse()?;

        let session = self.store.update_status(id, status).await?;

        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let session_id = session.id.clone();
        self.queue.spawn(format!("update:{session_id}"), async move {
            notify_engine(&store, notifier.as_ref(), &session_id).await;
        });

        Ok(session)
    }

    pub fn delete_session(&self, id: &str) -> Result<Session, SessionError> {
        self.store.delete(required("id", id)?)
    }

    pub fn session(&self, id: &str) -> Result<Session, SessionError> {
        self.store.get_by_id(id)
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.store.get_all()
    }

    /// The `limit` most recent sessions, or the configured default.
    pub fn recent_sessions(&self, limit: Option<usize>) -> Vec<Session> {
        self.store.get_recent(limit.unwrap_or(self.recent_limit))
    }

    pub fn session_details(&self, id: &str) -> Result<SessionDetails, SessionError> {
        self.store.session_details(id)
    }

    pub fn integration_payload(&self, id: &str) -> Result<IntegrationPayload, SessionError> {
        self.store.integration_payload(id)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        self.store.catalog()
    }

    pub fn notifier(&self) -> &Arc<dyn EngineNotifier> {
        &self.notifier
    }

    pub fn queue(&self) -> &Arc<BackgroundQueue> {
        &self.queue
    }

    /// Settle background jobs per the dispatch policy, then flush sessions.
    pub async fn shutdown(&self) -> anyhow::Result<ShutdownReport> {
        let report = self
            .queue
            .shutdown(self.dispatch.shutdown_policy, self.dispatch.drain_timeout())
            .await;
        self.store
            .flush()
            .await
            .context("Failed to flush sessions during shutdown")?;
        Ok(report)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, SessionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed)
}

async fn run_start_job(store: &SessionStore, notifier: &dyn EngineNotifier, session_id: &str) {
    match store
        .advance(session_id, SessionStatus::Pending, SessionStatus::Running)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::info!(session_id, "session left pending before start; not starting");
            return;
        }
        Err(SessionError::Storage(e)) => {
            tracing::warn!(session_id, "session started but not persisted: {e:#}");
        }
        Err(e) => {
            tracing::warn!(session_id, "session start abandoned: {e}");
            return;
        }
    }

    notify_engine(store, notifier, session_id).await;
}

async fn notify_engine(store: &SessionStore, notifier: &dyn EngineNotifier, session_id: &str) {
    let payload = match store.build_integration_payload(session_id) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(session_id, "no payload for engine: {e}");
            return;
        }
    };

    match notifier.deliver(&payload).await {
        Ok(()) => tracing::info!(
            session_id,
            notifier = notifier.name(),
            destination = notifier.destination(),
            "engine notified"
        ),
        Err(e) => tracing::warn!(
            session_id,
            notifier = notifier.name(),
            destination = notifier.destination(),
            "engine notification failed: {e:#}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::ShutdownPolicy;
    use crate::sessions::{MemoryStorage, TransitionPolicy};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        delivered: Mutex<Vec<serde_json::Value>>,
        fail: bool,
    }

    #[async_trait]
    impl EngineNotifier for RecordingNotifier {
        async fn deliver(&self, payload: &[u8]) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("engine offline");
            }
            self.delivered.lock().push(serde_json::from_slice(payload)?);
            Ok(())
        }

        fn destination(&self) -> &str {
            "test://engine"
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct SlowNotifier {
        delay: std::time::Duration,
    }

    #[async_trait]
    impl EngineNotifier for SlowNotifier {
        async fn deliver(&self, _payload: &[u8]) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            anyhow::bail!("engine timed out")
        }

        fn destination(&self) -> &str {
            "test://slow-engine"
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    async fn console_with(
        notifier: Arc<dyn EngineNotifier>,
        policy: TransitionPolicy,
    ) -> (TrainingConsole, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let queue = Arc::new(BackgroundQueue::new());
        let store = SessionStore::open(
            storage.clone(),
            create_catalog(),
            policy,
            Arc::clone(&queue),
        )
        .await
        .unwrap();
        let console = TrainingConsole::new(
            Arc::new(store),
            notifier,
            queue,
            DispatchConfig::default(),
            2,
        );
        (console, storage)
    }

    #[tokio::test]
    async fn start_session_runs_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (console, _) = console_with(notifier.clone(), TransitionPolicy::Strict).await;

        let session = console.start_session(" 1 ", "2", "1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.scenario_id, "1");

        console.queue().wait_idle().await;

        assert_eq!(
            console.session(&session.id).unwrap().status,
            SessionStatus::Running
        );
        let delivered = notifier.delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0]["sessionId"], session.id.as_str());
        assert_eq!(delivered[0]["status"], "running");
        assert_eq!(delivered[0]["avatar"]["Name"], "Customer Support");
    }

    #[tokio::test]
    async fn slow_engine_does_not_delay_other_sessions() {
        let notifier = Arc::new(SlowNotifier {
            delay: std::time::Duration::from_secs(3),
        });
        let (console, _) = console_with(notifier, TransitionPolicy::Strict).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(console.start_session("1", "1", "1").await.unwrap().id);
        }
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        for id in &ids {
            assert_eq!(console.session(id).unwrap().status, SessionStatus::Running);
        }
        assert_eq!(console.queue().pending(), 3);

        let updated = console.change_status(&ids[1], "paused").await.unwrap();
        assert_eq!(updated.status, SessionStatus::Paused);
    }

    #[tokio::test]
    async fn empty_identifiers_are_rejected_before_the_store() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (console, storage) = console_with(notifier, TransitionPolicy::Permissive).await;

        for (s, a, o) in [("", "1", "1"), ("1", "  ", "1"), ("1", "1", "")] {
            let err = console.start_session(s, a, o).await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidInput(_)));
        }
        assert!(console.sessions().is_empty());
        assert_eq!(storage.save_count(), 0);
    }

    #[tokio::test]
    async fn change_status_parses_labels_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (console, _) = console_with(notifier.clone(), TransitionPolicy::Permissive).await;
        let session = console.start_session("1", "1", "1").await.unwrap();
        console.queue().wait_idle().await;

        let err = console.change_status(&session.id, "finished").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));

        let updated = console.change_status(&session.id, "Completed").await.unwrap();
        assert_eq!(updated.status, SessionStatus::Completed);
        assert!(updated.end_time.is_some());

        console.queue().wait_idle().await;
        let delivered = notifier.delivered.lock();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[1]["status"], "completed");
    }

    #[tokio::test]
    async fn change_status_on_unknown_session_is_not_found() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (console, _) = console_with(notifier.clone(), TransitionPolicy::Permissive).await;

        let err = console.change_status("session_nope", "running").await.unwrap_err();

        assert!(matches!(err, SessionError::NotFound(_)));
        console.queue().wait_idle().await;
        assert!(notifier.delivered.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_never_touches_session_state() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        let (console, _) = console_with(notifier, TransitionPolicy::Permissive).await;

        let session = console.start_session("1", "1", "1").await.unwrap();
        console.queue().wait_idle().await;

        assert_eq!(
            console.session(&session.id).unwrap().status,
            SessionStatus::Running
        );
    }

    #[tokio::test]
    async fn recent_sessions_defaults_to_configured_limit() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (console, _) = console_with(notifier, TransitionPolicy::Permissive).await;
        for _ in 0..4 {
            console.start_session("1", "1", "1").await.unwrap();
        }

        assert_eq!(console.recent_sessions(None).len(), 2);
        assert_eq!(console.recent_sessions(Some(3)).len(), 3);
        assert_eq!(console.sessions().len(), 4);
    }

    #[tokio::test]
    async fn shutdown_drains_jobs_and_flushes() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (console, storage) = console_with(notifier.clone(), TransitionPolicy::Permissive).await;
        let keep = console.start_session("1", "1", "1").await.unwrap();
        let gone = console.start_session("2", "2", "2").await.unwrap();
        console.delete_session(&gone.id).unwrap();

        let report = console.shutdown().await.unwrap();

        assert_eq!(report.dropped, 0);
        assert!(report.completed >= 3);
        let persisted: Vec<_> = storage.snapshot().into_iter().map(|s| s.id).collect();
        assert_eq!(persisted, vec![keep.id]);
        assert!(console.queue().is_shut_down());
    }

    #[tokio::test]
    async fn from_config_uses_memory_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config {
            config_dir: tmp.path().to_path_buf(),
            config_path: tmp.path().join("config.toml"),
            ..Config::default()
        };
        config.storage.backend = "memory".into();
        config.dispatch.shutdown_policy = ShutdownPolicy::Drop;
        config.dispatch.drain_timeout_secs = 1;

        let console = TrainingConsole::from_config(&config).await.unwrap();
        console.start_session("1", "1", "1").await.unwrap();

        assert_eq!(console.store().storage_location(), "memory");
        assert_eq!(console.notifier().name(), "log");
        console.shutdown().await.unwrap();
        assert!(!tmp.path().join("data").exists());
    }
}
