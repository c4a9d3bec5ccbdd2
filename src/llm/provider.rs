//! Completion backend trait.

use async_trait::async_trait;

use crate::error::LlmError;

/// A text-completion service: submit a prompt for a model, get text back.
///
/// Implementations issue exactly one request per call. They must not retry;
/// a transport error, non-success status, or timeout is returned as an error
/// and aborts the run that issued it.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short backend name for logs and errors (e.g. "ollama").
    fn name(&self) -> &str;

    /// Complete `prompt` with `model` and return the response text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}
