//! Deterministic overlapping text chunking
//!
//! Splits a document into chunks of at most `chunk_size` bytes, snapping
//! chunk ends back to paragraph/sentence/word boundaries where possible.
//! Each chunk after the first starts exactly `overlap` bytes (rounded down
//! to a char boundary) before the previous chunk's end, so concatenating
//! the first chunk with every later chunk's non-overlapping suffix
//! reconstructs the input losslessly.

use super::{Document, DocumentMetadata};

/// Boundary patterns tried in preference order when snapping a chunk end.
const BREAK_PATTERNS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// A bounded-length slice of source text, the unit of embedding and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Split a document into overlapping chunks. Deterministic for a given input
/// and parameters.
pub fn split(document: &Document, params: &ChunkParams) -> Vec<Chunk> {
    let text = document.text.as_str();
    if text.is_empty() {
        return Vec::new();
    }

    let chunk_size = params.chunk_size.max(1);
    let overlap = params.overlap.min(chunk_size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = chunk_end(text, start, chunk_size, overlap);
        chunks.push(Chunk {
            text: text[start..end].to_string(),
            metadata: document.metadata.clone(),
        });
        if end == text.len() {
            break;
        }
        start = floor_char(text, end - overlap);
    }
    chunks
}

/// Pick the end of the chunk starting at `start`.
fn chunk_end(text: &str, start: usize, chunk_size: usize, overlap: usize) -> usize {
    let hard_end = floor_char(text, start + chunk_size);
    if hard_end >= text.len() {
        return text.len();
    }
    // The snapped end must leave room for the next chunk to start after
    // `start`, otherwise splitting would not make progress.
    let min_end = ceil_char(text, start + overlap + 1);
    if min_end >= hard_end {
        return hard_end;
    }

    let window = &text[min_end..hard_end];
    for pattern in BREAK_PATTERNS {
        if let Some(pos) = window.rfind(pattern) {
            return min_end + pos + pattern.len();
        }
    }
    hard_end
}

fn floor_char(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
