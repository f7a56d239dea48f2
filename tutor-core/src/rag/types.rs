use serde::{Deserialize, Serialize};

/// A curriculum document as held by the chunk store.
///
/// Documents are produced by ingestion and are read-only to retrieval. The
/// chunk order is the order the retriever scans them in.
///
/// # Example
///
/// ```no_run
/// # use tutor_core::rag::{Chunk, Document};
/// let doc = Document::new("biology-unit-1")
///     .with_chunk(Chunk::new("Cells are the basic unit of life.", 1, 0, vec![0.1, 0.2, 0.3]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub text_chunks: Vec<Chunk>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text_chunks: Vec::new(),
        }
    }

    pub fn with_chunk(mut self, chunk: Chunk) -> Self {
        self.text_chunks.push(chunk);
        self
    }
}

/// A fragment of source text with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub page_number: i64,
    pub chunk_number: i64,
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn new(
        text: impl Into<String>,
        page_number: i64,
        chunk_number: i64,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            text: text.into(),
            page_number,
            chunk_number,
            embedding,
        }
    }
}

/// A chunk selected for the context window.
///
/// `similarity` is the cosine similarity in `[-1.0, 1.0]` when chunks were
/// ranked by embedding, and `None` for substring matches, which are not scored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub similarity: Option<f32>,
    pub text: String,
    pub page_number: i64,
    pub chunk_number: i64,
}

impl ScoredChunk {
    pub(crate) fn from_chunk(chunk: &Chunk, similarity: Option<f32>) -> Self {
        Self {
            similarity,
            text: chunk.text.clone(),
            page_number: chunk.page_number,
            chunk_number: chunk.chunk_number,
        }
    }
}

/// Outcome of a retrieval over the chunk store.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// The store holds no chunks at all.
    NoData,
    /// Ranked hits, best first. May be empty when nothing matched.
    Context(Vec<ScoredChunk>),
}

impl Retrieval {
    /// Renders the hits into the context window passed to generation.
    ///
    /// Returns `None` for [`Retrieval::NoData`].
    pub fn render(&self) -> Option<String> {
        match self {
            Retrieval::NoData => None,
            Retrieval::Context(hits) => Some(render_context(hits)),
        }
    }
}

/// Joins hits in ranked order, each prefixed with its locator and score.
pub fn render_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| match hit.similarity {
            Some(score) => format!(
                "[Page {}, Chunk {}, Similarity {:.2}]\n{}",
                hit.page_number, hit.chunk_number, score, hit.text
            ),
            None => format!(
                "[Page {}, Chunk {}]\n{}",
                hit.page_number, hit.chunk_number, hit.text
            ),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
