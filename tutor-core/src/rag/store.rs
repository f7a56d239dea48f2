//! Chunk store abstraction and factory.
//!
//! This module provides a unified interface over the places curriculum
//! documents can live.

use super::file_store::FileStore;
use super::memory_store::MemoryStore;
use super::qdrant_store::QdrantStore;
use super::types::Document;
use crate::config::StorageMode;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Unified interface for chunk store operations.
///
/// Retrieval only ever calls [`fetch_all`](ChunkStore::fetch_all); the write
/// side exists for ingestion.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Returns every document with its chunks in order.
    async fn fetch_all(&self) -> Result<Vec<Document>>;

    /// Adds a document, replacing any existing document with the same id.
    async fn insert(&self, document: Document) -> Result<()>;

    /// Returns the total number of chunks in the store.
    async fn count(&self) -> Result<usize>;

    /// Removes all documents from the store.
    async fn clear(&self) -> Result<()>;
}

/// Creates a chunk store for the configured backend.
///
/// - `Memory` starts empty and lives as long as the process
/// - `File` reads and writes a JSON array of documents
/// - `Qdrant` connects to a remote collection over gRPC
///
/// # Arguments
///
/// * `mode` - Storage backend selection
/// * `vector_size` - Dimension of the embedding vectors
pub async fn create_chunk_store(mode: &StorageMode, vector_size: u64) -> Result<Arc<dyn ChunkStore>> {
    match mode {
        StorageMode::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageMode::File { path } => Ok(Arc::new(FileStore::new(path))),
        StorageMode::Qdrant { url, collection, api_key, .. } => {
            let store = QdrantStore::new(url, collection, api_key.as_deref(), vector_size).await?;
            Ok(Arc::new(store))
        }
    }
}
