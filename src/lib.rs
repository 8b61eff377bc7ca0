pub mod api;
pub mod config;
pub mod ingestion;
pub mod rag;
pub mod tenants;
pub mod vector;

// Re-export the types most callers need
pub use api::{build_router, AppState, ConversationStore};
pub use config::{AppConfig, CompletionConfig, ConfigError};
pub use ingestion::{split, Chunk, ChunkParams, Document, DocumentMetadata, IngestError, WebLoader};
pub use rag::{
    CompletionBackend, OpenAiChat, RagError, RagResult, Responder, StaticCompletion,
};
pub use tenants::{TenantConfig, TenantError, TenantStore};
pub use vector::{Embedder, HashEmbedder, HttpEmbedder, ScoredChunk, VectorStore, VectorStoreError};
