//! Model discovery for a local Ollama install.
//!
//! The HTTP listing (`/api/tags`) is preferred. When the server cannot be
//! reached that way, the `ollama list` CLI output is parsed instead.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::ollama::trim_base_url;

/// Discovery requests timeout (seconds).
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a reqwest client with the discovery timeout.
fn build_discovery_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to build discovery HTTP client with timeout: {e}; using default"
            );
            reqwest::Client::new()
        })
}

/// Lists the models a backend can serve.
#[async_trait]
pub trait ModelListFetcher: Send + Sync {
    /// List all available model IDs, in the order the backend reports them.
    async fn fetch_model_ids(&self) -> Result<Vec<String>, LlmError>;
}

// ---------------------------------------------------------------------------
// Ollama /api/tags
// ---------------------------------------------------------------------------

/// Fetches models from an Ollama instance via `/api/tags`.
pub struct OllamaModelFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaModelFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            client: build_discovery_client(),
        }
    }
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelEntry>,
}

#[derive(Deserialize)]
struct OllamaModelEntry {
    name: String,
}

#[async_trait]
impl ModelListFetcher for OllamaModelFetcher {
    async fn fetch_model_ids(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "ollama".to_string(),
                reason: format!("Model discovery request failed: {}", e),
            })?;

        if !resp.status().is_success() {
            return Err(LlmError::RequestFailed {
                provider: "ollama".to_string(),
                reason: format!("Model discovery returned HTTP {}", resp.status()),
            });
        }

        let body: OllamaTagsResponse = resp.json().await.map_err(|e| LlmError::RequestFailed {
            provider: "ollama".to_string(),
            reason: format!("Failed to parse tags response: {}", e),
        })?;

        Ok(body.models.into_iter().map(|m| m.name).collect())
    }
}

// ---------------------------------------------------------------------------
// `ollama list` CLI
// ---------------------------------------------------------------------------

/// Fetches models by running `ollama list` and reading its table output.
pub struct OllamaCliFetcher {
    program: String,
}

impl OllamaCliFetcher {
    pub fn new() -> Self {
        Self {
            program: "ollama".to_string(),
        }
    }
}

impl Default for OllamaCliFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelListFetcher for OllamaCliFetcher {
    async fn fetch_model_ids(&self) -> Result<Vec<String>, LlmError> {
        let output = tokio::time::timeout(
            DISCOVERY_TIMEOUT,
            tokio::process::Command::new(&self.program)
                .arg("list")
                .output(),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            provider: "ollama".to_string(),
            timeout: DISCOVERY_TIMEOUT,
        })?
        .map_err(|e| LlmError::RequestFailed {
            provider: "ollama".to_string(),
            reason: format!("Failed to run '{} list': {}", self.program, e),
        })?;

        if !output.status.success() {
            return Err(LlmError::RequestFailed {
                provider: "ollama".to_string(),
                reason: format!(
                    "'{} list' exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(parse_ollama_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Model names from `ollama list` output: skip the header row, take the
/// first whitespace-separated column of every non-empty line.
pub fn parse_ollama_list(stdout: &str) -> Vec<String> {
    stdout
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Try each fetcher in order and return the first successful listing.
pub async fn discover_models(
    fetchers: &[&dyn ModelListFetcher],
) -> Result<Vec<String>, LlmError> {
    let mut last_err = None;
    for fetcher in fetchers {
        match fetcher.fetch_model_ids().await {
            Ok(ids) => return Ok(ids),
            Err(e) => {
                tracing::warn!("Model discovery attempt failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| LlmError::RequestFailed {
        provider: "ollama".to_string(),
        reason: "no model discovery source configured".to_string(),
    }))
}
