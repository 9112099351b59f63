use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

use super::traits::EngineNotifier;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// POSTs each payload as `application/json` to the configured endpoint.
pub struct HttpEngineNotifier {
    endpoint: String,
    client: Client,
}

impl HttpEngineNotifier {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = endpoint.trim();
        reqwest::Url::parse(endpoint)
            .with_context(|| format!("Invalid engine endpoint '{endpoint}'"))?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .context("Failed to build engine HTTP client")?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

#[async_trait]
impl EngineNotifier for HttpEngineNotifier {
    async fn deliver(&self, payload: &[u8]) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("engine request to {} failed: {e}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read engine error body>".to_string());
            anyhow::bail!("engine rejected payload ({status}): {}", truncate(&body));
        }

        Ok(())
    }

    fn destination(&self) -> &str {
        &self.endpoint
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}
