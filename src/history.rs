//! Chat history
//!
//! Ordered user/assistant turns forwarded to providers with each request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Lenient parse; anything that is not a model/assistant turn is a user turn
    pub fn parse(role: &str) -> Self {
        match role.to_lowercase().as_str() {
            "assistant" | "agent" | "model" => ChatRole::Assistant,
            _ => ChatRole::User,
        }
    }
}

impl From<String> for ChatRole {
    fn from(role: String) -> Self {
        ChatRole::parse(&role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Record one question and the answer it received
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.turns.push(ChatTurn::user(question));
        self.turns.push(ChatTurn::assistant(answer));
    }

    /// Keep only the `keep` most recent turns
    pub fn trim_to_recent(&mut self, keep: usize) {
        if self.turns.len() > keep {
            let excess = self.turns.len() - keep;
            self.turns.drain(..excess);
        }
    }
}
