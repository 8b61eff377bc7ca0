//! Knowledge ingestion: document loading and chunking
//!
//! PDF files and fetched web pages are converted into [`Document`]s, split
//! into overlapping [`Chunk`]s, and handed to the vector store.

pub mod chunker;
pub mod loader;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chunker::{split, Chunk, ChunkParams};
pub use loader::{extract_paragraph_text, is_safe_url, load_pdf, WebLoader};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Only PDF files are accepted")]
    UnsupportedFile,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Failed to process document: {0}")]
    DocumentProcessing(String),

    #[error("Unsafe URL blocked: {0}")]
    UnsafeUrl(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No text content extracted from {0}")]
    EmptyExtraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True when the failure was caused by client input rather than the
    /// server or a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::UnsupportedFile
                | IngestError::InvalidFilename(_)
                | IngestError::UnsafeUrl(_)
        )
    }
}

/// Where a document came from, carried through to every derived chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Plain-text document produced by a loader. Immutable once created.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page,
            },
        }
    }
}
