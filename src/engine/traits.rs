use async_trait::async_trait;

/// Delivers serialized integration payloads to the external VR engine.
///
/// Delivery is best-effort and at-most-once: callers log failures and never
/// retry, and nothing a notifier returns feeds back into session state.
#[async_trait]
pub trait EngineNotifier: Send + Sync {
    /// Send one payload (JSON bytes) to the engine.
    async fn deliver(&self, payload: &[u8]) -> anyhow::Result<()>;

    /// Where payloads go, for logs and status output.
    fn destination(&self) -> &str;

    /// The name of this notifier implementation.
    fn name(&self) -> &str;
}
