//! In-memory chunk storage.

use super::store::ChunkStore;
use super::types::Document;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// An in-memory chunk store.
///
/// Documents are kept in insertion order behind an `Arc<RwLock>`. Data is lost
/// when the process ends, which makes this store suitable for tests and for
/// trying out ingestion without a backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with documents.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Document>>> {
        self.documents
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Document>>> {
        self.documents
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Document>> {
        Ok(self.read()?.clone())
    }

    async fn insert(&self, document: Document) -> Result<()> {
        let mut docs = self.write()?;
        match docs.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.iter().map(|d| d.text_chunks.len()).sum())
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}
