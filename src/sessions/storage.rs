use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::traits::{Session, SessionStorage};
use crate::infra::write_atomically;

/// Sessions persisted as one pretty-printed JSON array.
///
/// A missing or empty file loads as an empty collection. Anything else that
/// fails to parse is an error: the file is never silently replaced.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<Session>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no sessions file yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read sessions file: {}", self.path.display())
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse sessions file: {}", self.path.display()))
    }

    async fn save(&self, sessions: &[Session]) -> Result<()> {
        let json =
            serde_json::to_string_pretty(sessions).context("Failed to serialize sessions")?;
        write_atomically(&self.path, json.as_bytes()).await
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Volatile storage that keeps the last saved snapshot in memory.
#[derive(Default)]
pub struct MemoryStorage {
    saved: Mutex<Vec<Session>>,
    saves: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection, as if it had been saved before.
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        Self {
            saved: Mutex::new(sessions),
            saves: Mutex::new(0),
        }
    }

    /// The most recently saved collection.
    pub fn snapshot(&self) -> Vec<Session> {
        self.saved.lock().clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Vec<Session>> {
        Ok(self.snapshot())
    }

    async fn save(&self, sessions: &[Session]) -> Result<()> {
        *self.saved.lock() = sessions.to_vec();
        *self.saves.lock() += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".into()
    }

    fn name(&self) -> &str {
        "memory"
    }
}
