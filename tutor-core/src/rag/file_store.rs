//! JSON file chunk storage.
//!
//! The file holds a JSON array of documents, the same shape a document
//! database export produces (`_id` is accepted for the id).

use super::store::ChunkStore;
use super::types::Document;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Chunk store backed by a single JSON file.
///
/// The file is read on every [`fetch_all`](ChunkStore::fetch_all), so edits
/// made by an external ingestion job are visible on the next query. Writes
/// are serialized through a mutex and replace the file atomically via a
/// temporary sibling.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<Document>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    async fn save(&self, documents: &[Document]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string(documents)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for FileStore {
    /// A missing file is an empty corpus; an unreadable or corrupt one is not.
    async fn ping(&self) -> Result<()> {
        self.load().await.map(|_| ())
    }

    async fn fetch_all(&self) -> Result<Vec<Document>> {
        self.load().await
    }

    async fn insert(&self, document: Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.load().await?;
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
        self.save(&documents).await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load().await?.iter().map(|d| d.text_chunks.len()).sum())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save(&[]).await
    }
}
