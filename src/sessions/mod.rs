//! Training sessions: the lifecycle store, its durable storage and the
//! payload joins consumed by the VR engine.

pub mod lifecycle;
pub mod payload;
pub mod storage;
pub mod store;
pub mod traits;

pub use lifecycle::{apply_status, TransitionPolicy};
pub use payload::{DanglingReference, IntegrationPayload, SessionDetails};
pub use storage::{JsonFileStorage, MemoryStorage};
pub use store::SessionStore;
pub use traits::{Session, SessionError, SessionStatus, SessionStorage};

use std::path::PathBuf;
use std::sync::Arc;

/// Create the storage backend named by `backend` (`file` or `memory`).
pub fn create_storage(backend: &str, sessions_file: PathBuf) -> anyhow::Result<Arc<dyn SessionStorage>> {
    match backend.trim() {
        "file" => Ok(Arc::new(JsonFileStorage::new(sessions_file))),
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        "" => anyhow::bail!("storage.backend cannot be empty"),
        other => anyhow::bail!("Unknown storage backend '{other}'. Supported values: file, memory"),
    }
}
