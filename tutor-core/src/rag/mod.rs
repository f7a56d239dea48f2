//! Retrieval over the curriculum corpus.
//!
//! # Overview
//!
//! Every question goes through the same read path:
//!
//! 1. Read all documents from the [`ChunkStore`]. An empty corpus yields
//!    [`Retrieval::NoData`] and nothing else happens.
//! 2. Depending on [`MatchStrategy`]:
//!    - `Embedding`: embed the query and rank every chunk by cosine
//!      similarity, keeping the best [`TOP_K`].
//!    - `Substring`: keep the first [`TOP_K`] chunks whose text contains the
//!      query, ignoring case.
//! 3. Render the hits with [`render_context`] for the generation prompt.
//!
//! Ranking is a brute-force linear scan; there is no vector index.
//!
//! # Components
//!
//! - [`RagEngine`]: ties the embedder, store and strategy together
//! - [`Embedder`]: query and chunk embeddings through a [`Provider`]
//! - [`ChunkStore`]: memory, JSON file and Qdrant backends
//! - [`indexer`]: page splitting and chunking for ingestion

mod embedder;
pub mod indexer;
mod file_store;
mod memory_store;
mod qdrant_store;
mod retriever;
mod similarity;
mod store;
mod types;

pub use embedder::{Embedder, EmbedderError};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use qdrant_store::QdrantStore;
pub use retriever::{chunk_count, match_substring, rank_by_embedding, TOP_K};
pub use similarity::cosine_similarity;
pub use store::{create_chunk_store, ChunkStore};
pub use types::{render_context, Chunk, Document, Retrieval, ScoredChunk};

use crate::config::{Config, MatchStrategy};
use crate::provider::Provider;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RagError {
    /// The query or a chunk could not be embedded.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbedderError),

    /// The chunk store could not be read or written.
    #[error("Chunk store error: {0}")]
    Store(String),

    #[error("Indexer error: {0}")]
    Indexer(#[from] indexer::IndexerError),
}

pub type Result<T> = std::result::Result<T, RagError>;

fn store_error(e: anyhow::Error) -> RagError {
    RagError::Store(format!("{e:#}"))
}

/// Totals from an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
}

/// The retrieval engine.
///
/// Cheap to clone; the embedder and the store are shared.
#[derive(Clone)]
pub struct RagEngine {
    embedder: Embedder,
    store: Arc<dyn ChunkStore>,
    strategy: MatchStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RagEngine {
    /// Builds an engine from configuration, an embedding provider and a store.
    ///
    /// # Example
    ///
    /// ```
    /// # use tutor_core::{Config, rag::{RagEngine, MemoryStore}, provider::OllamaProvider};
    /// # use std::sync::Arc;
    /// let config = Config::default();
    /// let provider = Arc::new(OllamaProvider::new("http://localhost:11434"));
    /// let engine = RagEngine::new(&config, provider, Arc::new(MemoryStore::new()));
    /// ```
    pub fn new(config: &Config, provider: Arc<dyn Provider>, store: Arc<dyn ChunkStore>) -> Self {
        let embedder = Embedder::new(
            provider,
            config.embedding.model.clone(),
            config.embedding.dimensions,
        );

        Self {
            embedder,
            store,
            strategy: config.rag.strategy,
            chunk_size: config.rag.chunk_size,
            chunk_overlap: config.rag.chunk_overlap,
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Embedding length the configured model is expected to produce.
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Checks that the chunk store is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await.map_err(store_error)
    }

    /// Finds the chunks most relevant to `query`.
    ///
    /// The corpus is read before anything else so an empty store never costs
    /// an embedding request.
    ///
    /// # Errors
    ///
    /// - [`RagError::Store`] if the corpus cannot be read
    /// - [`RagError::EmbeddingUnavailable`] if the query cannot be embedded
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        let documents = self.store.fetch_all().await.map_err(store_error)?;

        let total = chunk_count(&documents);
        debug!(documents = documents.len(), chunks = total, "Loaded corpus");
        if total == 0 {
            debug!("Corpus is empty, returning NoData");
            return Ok(Retrieval::NoData);
        }

        let hits = match self.strategy {
            MatchStrategy::Embedding => {
                let query_embedding = self.embedder.embed(query).await?;
                rank_by_embedding(&query_embedding, &documents, TOP_K)
            }
            MatchStrategy::Substring => match_substring(query, &documents, TOP_K),
        };

        debug!(strategy = ?self.strategy, hits = hits.len(), "Retrieved context");
        Ok(Retrieval::Context(hits))
    }

    /// Retrieves and renders context for `query`.
    ///
    /// Returns `None` when the corpus is empty.
    pub async fn retrieve_context(&self, query: &str) -> Result<Option<String>> {
        Ok(self.retrieve(query).await?.render())
    }

    /// Total number of chunks in the store.
    pub async fn count(&self) -> Result<usize> {
        self.store.count().await.map_err(store_error)
    }

    /// Number of documents in the store.
    pub async fn document_count(&self) -> Result<usize> {
        Ok(self.store.fetch_all().await.map_err(store_error)?.len())
    }

    /// Removes every document from the store.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await.map_err(store_error)
    }

    /// Chunks, embeds and stores a piece of text as one document.
    ///
    /// Pages are separated by form feeds. An existing document with the same
    /// id is replaced. Returns the number of chunks stored.
    pub async fn ingest_text(&self, id: &str, text: &str) -> Result<usize> {
        let pieces = indexer::chunk_document(text, self.chunk_size, self.chunk_overlap);
        if pieces.is_empty() {
            warn!(document = id, "No chunks created, skipping");
            return Ok(0);
        }

        let mut document = Document::new(id);
        for piece in pieces {
            let embedding = self.embedder.embed(&piece.text).await?;
            document = document.with_chunk(Chunk::new(
                piece.text,
                piece.page_number,
                piece.chunk_number,
                embedding,
            ));
        }

        let chunks = document.text_chunks.len();
        self.store.insert(document).await.map_err(store_error)?;
        debug!(document = id, chunks, "Stored document");
        Ok(chunks)
    }

    /// Ingests a file, or every `.txt`/`.md` file under a directory.
    ///
    /// Each file becomes one document named after its file stem.
    ///
    /// # Errors
    ///
    /// Stops at the first embedding or store failure; files ingested before
    /// it stay in the store.
    pub async fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
        let files = indexer::collect_files(path.as_ref()).await?;
        info!(files = files.len(), "Found curriculum files to ingest");

        let mut report = IngestReport::default();
        for file in files {
            let id = indexer::document_id(&file.path);
            let chunks = self.ingest_text(&id, &file.content).await?;
            if chunks == 0 {
                continue;
            }

            info!(file = %file.path.display(), chunks, "Ingested");
            report.files += 1;
            report.chunks += chunks;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatRequest, ChatResponse, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text by keyword so ranking is predictable.
    struct KeywordProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl KeywordProvider {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), fail: true }
        }
    }

    #[async_trait]
    impl Provider for KeywordProvider {
        async fn chat<'a>(
            &'a self,
            _request: ChatRequest,
            _callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
        ) -> crate::provider::Result<()> {
            Ok(())
        }

        async fn embed(&self, text: &str, _model: &str) -> crate::provider::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Api { status: 503, body: "down".into() });
            }
            let text = text.to_lowercase();
            Ok(vec![
                if text.contains("cell") { 1.0 } else { 0.0 },
                if text.contains("atom") { 1.0 } else { 0.0 },
            ])
        }
    }

    fn config(strategy: MatchStrategy) -> Config {
        let mut config = Config::default();
        config.embedding.dimensions = 2;
        config.rag.strategy = strategy;
        config.rag.chunk_size = 64;
        config.rag.chunk_overlap = 0;
        config
    }

    fn corpus() -> MemoryStore {
        MemoryStore::with_documents(vec![
            Document::new("biology")
                .with_chunk(Chunk::new("Atoms bond into molecules.", 1, 0, vec![0.0, 1.0]))
                .with_chunk(Chunk::new("The cell is the unit of life.", 1, 1, vec![1.0, 0.0])),
        ])
    }

    #[tokio::test]
    async fn test_empty_store_is_no_data_without_embedding() {
        let provider = Arc::new(KeywordProvider::new());
        let engine = RagEngine::new(
            &config(MatchStrategy::Embedding),
            provider.clone(),
            Arc::new(MemoryStore::new()),
        );

        assert_eq!(engine.retrieve("what is a cell").await.unwrap(), Retrieval::NoData);
        assert_eq!(engine.retrieve_context("what is a cell").await.unwrap(), None);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reports_configured_strategy_and_dimensions() {
        let engine = RagEngine::new(
            &config(MatchStrategy::Substring),
            Arc::new(KeywordProvider::new()),
            Arc::new(MemoryStore::new()),
        );

        assert_eq!(engine.strategy(), MatchStrategy::Substring);
        assert_eq!(engine.dimensions(), 2);
    }

    #[tokio::test]
    async fn test_embedding_strategy_ranks_and_renders() {
        let engine = RagEngine::new(
            &config(MatchStrategy::Embedding),
            Arc::new(KeywordProvider::new()),
            Arc::new(corpus()),
        );

        let context = engine.retrieve_context("what is a cell").await.unwrap().unwrap();
        assert_eq!(
            context,
            "[Page 1, Chunk 1, Similarity 1.00]\nThe cell is the unit of life.\n\n\
             [Page 1, Chunk 0, Similarity 0.00]\nAtoms bond into molecules."
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_is_distinct_error() {
        let engine = RagEngine::new(
            &config(MatchStrategy::Embedding),
            Arc::new(KeywordProvider::failing()),
            Arc::new(corpus()),
        );

        let err = engine.retrieve("cells").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_substring_strategy_skips_embedding() {
        let provider = Arc::new(KeywordProvider::failing());
        let engine = RagEngine::new(
            &config(MatchStrategy::Substring),
            provider.clone(),
            Arc::new(corpus()),
        );

        match engine.retrieve("UNIT OF LIFE").await.unwrap() {
            Retrieval::Context(hits) => {
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].chunk_number, 1);
                assert_eq!(hits[0].similarity, None);
            }
            other => panic!("expected context, got {other:?}"),
        }
        assert_eq!(
            engine.retrieve("gravity").await.unwrap(),
            Retrieval::Context(vec![])
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ingest_text_then_retrieve() {
        let store = Arc::new(MemoryStore::new());
        let engine = RagEngine::new(
            &config(MatchStrategy::Embedding),
            Arc::new(KeywordProvider::new()),
            store.clone(),
        );

        let chunks = engine
            .ingest_text("science", "Every atom has a nucleus.\x0cA cell has a membrane.")
            .await
            .unwrap();
        assert_eq!(chunks, 2);
        assert_eq!(engine.count().await.unwrap(), 2);
        assert_eq!(engine.document_count().await.unwrap(), 1);

        match engine.retrieve("tell me about the atom").await.unwrap() {
            Retrieval::Context(hits) => {
                assert_eq!(hits[0].text, "Every atom has a nucleus.");
                assert_eq!(hits[0].page_number, 1);
                assert_eq!(hits[1].page_number, 2);
            }
            other => panic!("expected context, got {other:?}"),
        }

        engine.clear().await.unwrap();
        assert_eq!(engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_path_reports_files_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cells.txt"), "The cell wall.").unwrap();
        std::fs::write(dir.path().join("atoms.md"), "Atom one.\x0cAtom two.").unwrap();
        std::fs::write(dir.path().join("blank.txt"), "   ").unwrap();

        let engine = RagEngine::new(
            &config(MatchStrategy::Embedding),
            Arc::new(KeywordProvider::new()),
            Arc::new(MemoryStore::new()),
        );

        let report = engine.ingest_path(dir.path()).await.unwrap();
        assert_eq!(report, IngestReport { files: 2, chunks: 3 });
        assert_eq!(engine.document_count().await.unwrap(), 2);
    }
}
