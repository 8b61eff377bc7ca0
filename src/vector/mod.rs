pub mod embeddings;
pub mod store;

pub use embeddings::{
    cosine_similarity, Embedder, EmbeddingError, HashEmbedder, HttpEmbedder, DEFAULT_DIMENSION,
};
pub use store::{ScoredChunk, VectorRecord, VectorStore, VectorStoreError};
