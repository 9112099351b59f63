use async_trait::async_trait;

use super::traits::EngineNotifier;

/// Logs payloads instead of sending them. The default until a live engine
/// endpoint is configured.
pub struct LogEngineNotifier {
    endpoint: String,
}

impl LogEngineNotifier {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim().to_string(),
        }
    }
}

#[async_trait]
impl EngineNotifier for LogEngineNotifier {
    async fn deliver(&self, payload: &[u8]) -> anyhow::Result<()> {
        let rendered = serde_json::from_slice::<serde_json::Value>(payload)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned());

        tracing::info!(destination = %self.endpoint, "engine payload:\n{rendered}");
        Ok(())
    }

    fn destination(&self) -> &str {
        &self.endpoint
    }

    fn name(&self) -> &str {
        "log"
    }
}
