//! Embedding generation using LLM providers.
//!
//! This module provides functionality to convert text into vector embeddings
//! using provider embedding models.

use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The API returned a vector of the wrong length.
    ///
    /// Cosine similarity is only defined between vectors of equal length, so a
    /// mismatch means the configured model does not match the indexed corpus.
    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Generates vector embeddings for text using provider embedding models.
///
/// # Supported Models
///
/// Any model served behind an OpenAI-compatible or Ollama endpoint, e.g.:
/// - `text-embedding-ada-002` - 1536-dimensional embeddings
/// - `nomic-embed-text` - 768-dimensional embeddings
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Generates a vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider API is unreachable or returns a non-success status
    /// - The API returns no embeddings
    /// - The vector length differs from the configured dimensions
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.provider.embed(text, &self.model).await?;

        if embedding.len() != self.dimensions {
            return Err(EmbedderError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatRequest, ChatResponse};
    use async_trait::async_trait;

    struct FixedProvider(Vec<f32>);

    #[async_trait]
    impl Provider for FixedProvider {
        async fn chat<'a>(
            &'a self,
            _request: ChatRequest,
            _callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
        ) -> crate::provider::Result<()> {
            Ok(())
        }

        async fn embed(&self, _text: &str, _model: &str) -> crate::provider::Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let embedder = Embedder::new(Arc::new(FixedProvider(vec![0.1, 0.2])), "test", 2);
        assert_eq!(embedder.embed("hi").await.unwrap(), vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_embed_rejects_wrong_dimensions() {
        let embedder = Embedder::new(Arc::new(FixedProvider(vec![0.1, 0.2, 0.3])), "test", 2);
        let err = embedder.embed("hi").await.unwrap_err();
        assert!(matches!(err, EmbedderError::DimensionMismatch { expected: 2, actual: 3 }));
    }
}
