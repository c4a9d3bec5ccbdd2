//! Ollama `/api/generate` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::provider::CompletionBackend;

const PROVIDER: &str = "ollama";

/// Default Ollama endpoint on the local machine.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default per-request timeout. Local inference can be slow.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Non-streaming Ollama completion client.
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            base_url: trim_base_url(base_url.into()),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let started = std::time::Instant::now();
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let resp = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: PROVIDER.to_string(),
                        timeout: self.timeout,
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: format!("Generate request failed: {e}"),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {}", detail.trim()),
            });
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    provider: PROVIDER.to_string(),
                    timeout: self.timeout,
                }
            } else {
                LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to parse generate response: {e}"),
                }
            }
        })?;

        tracing::debug!(
            model,
            duration_ms = started.elapsed().as_millis() as u64,
            "ollama.generate"
        );

        Ok(parsed.response.unwrap_or_default().trim().to_string())
    }
}

/// Strip trailing slashes so joined paths never contain `//`.
pub(crate) fn trim_base_url(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
