//! Qdrant chunk storage implementation.
//!
//! Each chunk is one point: the vector is the chunk embedding and the payload
//! carries the document id, text and locators. [`QdrantStore::fetch_all`]
//! scrolls the whole collection and regroups points into documents.

use super::store::ChunkStore;
use super::types::{Chunk, Document};
use anyhow::{Context, Result};
use async_trait::async_trait;
use qdrant_client::{
    Payload, Qdrant,
    qdrant::{
        vectors_config::Config, vectors_output::VectorsOptions, Condition,
        CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
        RetrievedPoint, ScrollPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
        VectorsConfig,
    },
};
use serde_json::json;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};

const SCROLL_BATCH: u32 = 256;

/// Qdrant-backed chunk store.
#[derive(Clone)]
pub struct QdrantStore {
    client: Arc<Qdrant>,
    collection_name: String,
    vector_size: u64,
}

impl QdrantStore {
    /// Connects to Qdrant and ensures the collection exists.
    ///
    /// # Arguments
    ///
    /// * `url` - gRPC endpoint, e.g. `http://localhost:6334`
    /// * `collection` - Collection holding the curriculum chunks
    /// * `api_key` - Optional API key for managed deployments
    /// * `vector_size` - Dimension of the embedding vectors
    pub async fn new(
        url: &str,
        collection: &str,
        api_key: Option<&str>,
        vector_size: u64,
    ) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = Arc::new(
            builder
                .build()
                .context("Failed to connect to Qdrant server")?,
        );

        let store = Self {
            client,
            collection_name: collection.to_string(),
            vector_size,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .context("Failed to check collection")?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection_name)
                        .vectors_config(VectorsConfig {
                            config: Some(Config::Params(
                                VectorParamsBuilder::new(self.vector_size, Distance::Cosine).build()
                            )),
                        })
                )
                .await
                .context("Failed to create collection")?;
        }

        Ok(())
    }

    /// Scrolls through every point in the collection.
    async fn scroll_all(&self) -> Result<Vec<RetrievedPoint>> {
        let mut points = Vec::new();
        let mut offset: Option<qdrant_client::qdrant::PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection_name)
                .limit(SCROLL_BATCH)
                .with_payload(true)
                .with_vectors(true);

            if let Some(off) = offset {
                builder = builder.offset(off);
            }

            let scroll_result = self.client
                .scroll(builder)
                .await
                .context("Failed to scroll points")?;

            points.extend(scroll_result.result);

            match scroll_result.next_page_offset {
                Some(next_offset) => offset = Some(next_offset),
                None => break,
            }
        }

        debug!(collection = %self.collection_name, points = points.len(), "Scrolled collection");
        Ok(points)
    }
}

#[async_trait]
impl ChunkStore for QdrantStore {
    async fn ping(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .context("Qdrant health check failed")?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Document>> {
        let points = self.scroll_all().await?;
        Ok(group_points(points))
    }

    async fn insert(&self, document: Document) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(Filter::must([Condition::matches(
                        "document_id",
                        document.id.clone(),
                    )]))
                    .wait(true),
            )
            .await
            .context("Failed to delete previous chunks")?;

        if document.text_chunks.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(document.text_chunks.len());
        for (position, chunk) in document.text_chunks.into_iter().enumerate() {
            let payload = Payload::try_from(json!({
                "document_id": document.id,
                "position": position,
                "text": chunk.text,
                "page_number": chunk.page_number,
                "chunk_number": chunk.chunk_number,
            }))
            .context("Failed to build point payload")?;

            let id = point_id(&document.id, position);
            points.push(PointStruct::new(id, chunk.embedding, payload));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .context("Failed to upsert points")?;

        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let info = self
            .client
            .collection_info(&self.collection_name)
            .await
            .context("Failed to get collection info")?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0) as usize)
    }

    async fn clear(&self) -> Result<()> {
        self.client
            .delete_collection(&self.collection_name)
            .await
            .context("Failed to delete collection")?;

        self.ensure_collection().await
    }
}

/// Stable numeric point id for a chunk position within a document.
fn point_id(document_id: &str, position: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    document_id.hash(&mut hasher);
    position.hash(&mut hasher);
    hasher.finish()
}

/// A chunk decoded from a point, before grouping.
#[derive(Debug)]
struct PointChunk {
    document_id: String,
    position: i64,
    chunk: Chunk,
}

fn decode_point(point: RetrievedPoint) -> Option<PointChunk> {
    let payload = &point.payload;
    let document_id = payload.get("document_id")?.as_str()?.to_string();
    let text = payload.get("text")?.as_str()?.to_string();
    let page_number = payload.get("page_number").and_then(|v| v.as_integer()).unwrap_or(0);
    let chunk_number = payload.get("chunk_number").and_then(|v| v.as_integer()).unwrap_or(0);
    let position = payload.get("position").and_then(|v| v.as_integer()).unwrap_or(chunk_number);

    #[allow(deprecated)]
    let embedding = match point.vectors.and_then(|v| v.vectors_options) {
        Some(VectorsOptions::Vector(vector)) => vector.data,
        _ => Vec::new(),
    };

    Some(PointChunk {
        document_id,
        position,
        chunk: Chunk {
            text,
            page_number,
            chunk_number,
            embedding,
        },
    })
}

/// Regroups scrolled points into documents.
///
/// Documents appear in order of their first point; chunks are ordered by the
/// position recorded at insert time.
fn group_points(points: Vec<RetrievedPoint>) -> Vec<Document> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<(i64, Chunk)>> = HashMap::new();

    for point in points {
        let Some(decoded) = decode_point(point) else {
            warn!("Skipping point without document_id/text payload");
            continue;
        };

        let entry = grouped.entry(decoded.document_id.clone()).or_insert_with(|| {
            order.push(decoded.document_id.clone());
            Vec::new()
        });
        entry.push((decoded.position, decoded.chunk));
    }

    order
        .into_iter()
        .filter_map(|id| {
            let mut chunks = grouped.remove(&id)?;
            chunks.sort_by_key(|(position, _)| *position);
            Some(Document {
                id,
                text_chunks: chunks.into_iter().map(|(_, chunk)| chunk).collect(),
            })
        })
        .collect()
}
