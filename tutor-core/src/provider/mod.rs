//! LLM provider abstraction layer.
//!
//! This module defines a common interface for the hosted backends
//! (OpenAI-compatible APIs, Ollama) that provide chat completions and embeddings.

mod types;
pub mod ollama;
pub mod openai;

// Re-export common types
pub use types::{
    Provider,
    ProviderError,
    Result,
    ChatRequest,
    ChatResponse,
    Message,
    EmbedRequest,
};

// Re-export provider implementations
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderKind;
use std::sync::Arc;

/// Builds a provider for the given backend.
///
/// `api_key` is required for OpenAI-compatible backends and ignored by Ollama.
pub fn create_provider(
    kind: ProviderKind,
    base_url: &str,
    api_key: Option<&str>,
) -> Result<Arc<dyn Provider>> {
    match kind {
        ProviderKind::OpenAi => {
            let key = api_key
                .ok_or_else(|| ProviderError::Other("OpenAI provider requires an API key".to_string()))?;
            Ok(Arc::new(OpenAiProvider::new(base_url, key)))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(base_url))),
    }
}
