//! In-process conversation memory
//!
//! Chat history keyed by conversation id, owned by the API layer and passed
//! explicitly into the responder. Process-local only; history is lost on
//! restart.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::rag::HistoryTurn;

/// Turns retained per conversation; older turns are discarded.
const MAX_TURNS: usize = 20;

#[derive(Default)]
pub struct ConversationStore {
    turns: RwLock<HashMap<String, Vec<HistoryTurn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// History for a conversation, oldest turn first.
    pub async fn history(&self, conversation_id: &str) -> Vec<HistoryTurn> {
        self.turns
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a completed (user, assistant) exchange, keeping only the most
    /// recent [`MAX_TURNS`] turns.
    pub async fn record(&self, conversation_id: &str, query: &str, answer: &str) {
        let mut turns = self.turns.write().await;
        let history = turns.entry(conversation_id.to_string()).or_default();
        history.push(("user".to_string(), query.to_string()));
        history.push(("assistant".to_string(), answer.to_string()));
        if history.len() > MAX_TURNS {
            let excess = history.len() - MAX_TURNS;
            history.drain(..excess);
        }
    }
}
