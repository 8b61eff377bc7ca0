//! Retrieval-augmented responder
//!
//! Retrieves the top-k chunks for a query from the tenant namespace, builds
//! a prompt around the tenant instruction and chat history, and calls the
//! completion backend. Stateless per call; no retry or partial results.

use std::sync::Arc;

use crate::vector::VectorStore;

use super::completion::{ChatMessage, CompletionBackend};
use super::RagError;

/// Number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Longest source preview returned with an answer, in bytes.
const PREVIEW_LIMIT: usize = 200;

const ANSWER_GUIDANCE: &str = "Provide a clear and concise answer based on the provided context. \
     If the information is not available in the context, state that honestly.";

/// Answer plus supporting source snippets. Ephemeral, returned per request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RagResult {
    pub answer: String,
    pub sources: Vec<String>,
}

/// One prior conversational turn: (speaker, text).
pub type HistoryTurn = (String, String);

pub struct Responder {
    store: Arc<VectorStore>,
    completion: Arc<dyn CompletionBackend>,
    top_k: usize,
}

impl Responder {
    pub fn new(store: Arc<VectorStore>, completion: Arc<dyn CompletionBackend>) -> Self {
        Self {
            store,
            completion,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer a query against a tenant namespace.
    pub async fn answer(
        &self,
        query: &str,
        namespace: &str,
        instruction: &str,
        history: &[HistoryTurn],
    ) -> Result<RagResult, RagError> {
        let retrieved = self.store.query(namespace, query, self.top_k).await?;

        let context: Vec<&str> = retrieved
            .iter()
            .map(|hit| hit.text.trim())
            .filter(|text| !text.is_empty())
            .collect();
        if context.is_empty() {
            return Err(RagError::ContextRetrieval);
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(build_system_prompt(
            instruction,
            &context,
        )));
        for (speaker, text) in history {
            match speaker.as_str() {
                "assistant" => messages.push(ChatMessage::assistant(text)),
                _ => messages.push(ChatMessage::user(text)),
            }
        }
        messages.push(ChatMessage::user(query));

        let answer = self
            .completion
            .complete(&messages)
            .await
            .map_err(RagError::Completion)?;
        if answer.trim().is_empty() {
            return Err(RagError::ResponseGeneration);
        }

        let sources = context.iter().map(|text| preview_snippet(text)).collect();

        Ok(RagResult { answer, sources })
    }
}

fn build_system_prompt(instruction: &str, context: &[&str]) -> String {
    let mut prompt = String::new();
    if !instruction.trim().is_empty() {
        prompt.push_str("Instructions for the assistant: ");
        prompt.push_str(instruction.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(ANSWER_GUIDANCE);
    prompt.push_str("\n\nContext:\n");
    for (i, text) in context.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, text));
    }
    prompt
}

/// Truncate chunk text to a short preview.
///
/// Text within the limit passes through unchanged; longer text is cut at the
/// last sentence end inside the limit, or hard-cut with an ellipsis when no
/// sentence boundary exists.
pub fn preview_snippet(text: &str) -> String {
    let content = text.trim();
    if content.len() <= PREVIEW_LIMIT {
        return content.to_string();
    }

    let mut cut = PREVIEW_LIMIT;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &content[..cut];
    match head.rfind('.') {
        Some(idx) if idx > 0 => content[..=idx].to_string(),
        _ => format!("{head}..."),
    }
}
