//! Retrieval-augmented generation: completion backends and the responder

pub mod completion;
pub mod responder;

use thiserror::Error;

pub use completion::{
    ChatMessage, CompletionBackend, CompletionError, OpenAiChat, StaticCompletion,
};
pub use responder::{preview_snippet, HistoryTurn, RagResult, Responder, DEFAULT_TOP_K};

use crate::vector::VectorStoreError;

/// Failures in the retrieval/generation pipeline. Each carries its root
/// cause; mapping to HTTP status codes happens once, at the API boundary.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("No valid context found")]
    ContextRetrieval,

    #[error("No answer generated")]
    ResponseGeneration,

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Completion backend error: {0}")]
    Completion(#[from] CompletionError),
}
