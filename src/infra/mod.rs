//! Process infrastructure: the background job queue and durable file writes.

pub mod atomic_file;
pub mod queue;
pub mod traits;

pub use atomic_file::write_atomically;
pub use queue::BackgroundQueue;
pub use traits::{ShutdownPolicy, ShutdownReport};

use std::sync::Arc;

/// Create the application's background queue. Requires a Tokio runtime.
pub fn create_background_queue() -> Arc<BackgroundQueue> {
    Arc::new(BackgroundQueue::new())
}
