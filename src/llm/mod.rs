//! LLM backend integration.
//!
//! The runner only needs "prompt in, text out" from a model, expressed by
//! [`CompletionBackend`]. The production backend is a local Ollama server;
//! tests substitute scripted backends.

pub mod discovery;
mod ollama;
mod provider;

pub use discovery::{
    ModelListFetcher, OllamaCliFetcher, OllamaModelFetcher, discover_models, parse_ollama_list,
};
pub use ollama::{DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT, OllamaClient};
pub use provider::CompletionBackend;
