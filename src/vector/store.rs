//! Namespace-partitioned persistent vector store
//!
//! Each tenant namespace maps to one JSON file under the data directory.
//! Records are append-mostly: `add` embeds and appends, `query` scans the
//! namespace by cosine similarity, `delete` removes records by source.
//! Queries never cross namespaces.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ingestion::{Chunk, DocumentMetadata};

use super::embeddings::{cosine_similarity, Embedder, EmbeddingError};

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vector store corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A persisted embedding plus the chunk text it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: Uuid,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A retrieval hit, ordered by descending similarity.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
}

/// Vector index adapter over an embedder and on-disk namespace collections.
pub struct VectorStore {
    data_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    namespaces: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl VectorStore {
    pub fn new(data_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            data_dir: data_dir.into(),
            embedder,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Embed each chunk and append it to the namespace collection.
    /// Returns the number of records added. No deduplication: ingesting the
    /// same content twice doubles the record count.
    pub async fn add(&self, namespace: &str, chunks: &[Chunk]) -> Result<usize, VectorStoreError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = futures::future::try_join_all(
            chunks.iter().map(|chunk| self.embedder.embed(&chunk.text)),
        )
        .await?;

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord {
                id: Uuid::new_v4(),
                embedding,
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
            })
            .collect();

        let added = records.len();
        {
            let mut namespaces = self.namespaces.write().await;
            self.load_into(&mut namespaces, namespace).await?;
            let collection = namespaces.entry(namespace.to_string()).or_default();
            collection.extend(records);
            self.persist(namespace, collection).await?;
        }

        info!("Added {added} record(s) to namespace {namespace}");
        Ok(added)
    }

    /// Top-k records by descending cosine similarity to the query text.
    /// An empty or unknown namespace returns an empty result.
    pub async fn query(
        &self,
        namespace: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let query_embedding = self.embedder.embed(query_text).await?;

        {
            let mut namespaces = self.namespaces.write().await;
            self.load_into(&mut namespaces, namespace).await?;
        }

        let namespaces = self.namespaces.read().await;
        let Some(collection) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<ScoredChunk> = collection
            .iter()
            .map(|record| ScoredChunk {
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                score: cosine_similarity(&query_embedding, &record.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// Remove every record in the namespace whose metadata source matches.
    /// Returns the number of records removed.
    pub async fn delete(&self, namespace: &str, source: &str) -> Result<usize, VectorStoreError> {
        let mut namespaces = self.namespaces.write().await;
        self.load_into(&mut namespaces, namespace).await?;

        let Some(collection) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };

        let before = collection.len();
        collection.retain(|record| record.metadata.source != source);
        let removed = before - collection.len();
        if removed > 0 {
            self.persist(namespace, collection).await?;
        }

        debug!("Removed {removed} record(s) with source {source} from {namespace}");
        Ok(removed)
    }

    /// Number of records currently stored in a namespace.
    pub async fn count(&self, namespace: &str) -> Result<usize, VectorStoreError> {
        let mut namespaces = self.namespaces.write().await;
        self.load_into(&mut namespaces, namespace).await?;
        Ok(namespaces.get(namespace).map_or(0, Vec::len))
    }

    /// Load a namespace from disk into the map if it is not resident yet.
    async fn load_into(
        &self,
        namespaces: &mut HashMap<String, Vec<VectorRecord>>,
        namespace: &str,
    ) -> Result<(), VectorStoreError> {
        if namespaces.contains_key(namespace) {
            return Ok(());
        }
        let path = self.namespace_path(namespace);
        if path.exists() {
            let raw = tokio::fs::read_to_string(&path).await?;
            let records: Vec<VectorRecord> = serde_json::from_str(&raw)?;
            debug!("Loaded {} record(s) for namespace {namespace}", records.len());
            namespaces.insert(namespace.to_string(), records);
        }
        Ok(())
    }

    /// Rewrite the namespace file. Written to a sibling temp file first so a
    /// crash mid-write cannot leave a truncated collection behind.
    async fn persist(
        &self,
        namespace: &str,
        records: &[VectorRecord],
    ) -> Result<(), VectorStoreError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.namespace_path(namespace);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string(records)?;
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        let safe: String = namespace
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("{safe}.json"))
    }
}
