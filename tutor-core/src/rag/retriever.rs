//! Chunk ranking over a full scan of the corpus.
//!
//! Both strategies walk every document in store order and every chunk in
//! document order. Ties and equal matches therefore resolve to scan order.

use super::similarity::cosine_similarity;
use super::types::{Document, ScoredChunk};
use tracing::warn;

/// Number of chunks kept in the context window.
pub const TOP_K: usize = 3;

/// Scores every chunk against `query_embedding` and keeps the best `top_k`.
///
/// Chunks whose embedding length differs from the query are skipped. The sort
/// is stable, so equal similarities keep scan order.
pub fn rank_by_embedding(
    query_embedding: &[f32],
    documents: &[Document],
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = Vec::new();

    for document in documents {
        for chunk in &document.text_chunks {
            if chunk.embedding.len() != query_embedding.len() {
                warn!(
                    document = %document.id,
                    page = chunk.page_number,
                    chunk = chunk.chunk_number,
                    expected = query_embedding.len(),
                    actual = chunk.embedding.len(),
                    "Skipping chunk with mismatched embedding dimensions"
                );
                continue;
            }

            let similarity = cosine_similarity(query_embedding, &chunk.embedding);
            scored.push(ScoredChunk::from_chunk(chunk, Some(similarity)));
        }
    }

    scored.sort_by(|a, b| {
        let a = a.similarity.unwrap_or(f32::MIN);
        let b = b.similarity.unwrap_or(f32::MIN);
        b.total_cmp(&a)
    });
    scored.truncate(top_k);
    scored
}

/// Returns the first `top_k` chunks whose text contains `query`, ignoring case.
///
/// The query is matched as given, surrounding whitespace included. An empty
/// query matches nothing.
pub fn match_substring(query: &str, documents: &[Document], top_k: usize) -> Vec<ScoredChunk> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    documents
        .iter()
        .flat_map(|document| document.text_chunks.iter())
        .filter(|chunk| chunk.text.to_lowercase().contains(&needle))
        .take(top_k)
        .map(|chunk| ScoredChunk::from_chunk(chunk, None))
        .collect()
}

/// Total number of chunks across all documents.
pub fn chunk_count(documents: &[Document]) -> usize {
    documents.iter().map(|d| d.text_chunks.len()).sum()
}
