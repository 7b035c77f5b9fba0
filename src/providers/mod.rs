//! LLM provider trait and shared request/outcome types
//!
//! Every provider receives the same persona and the same context-augmented
//! message. A provider call either yields text or a `ProviderFailure`; the two
//! never share a channel.

use crate::config::ProviderSettings;
use crate::history::ChatTurn;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub mod claude;
pub mod gemini;
pub mod groq;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use groq::GroqProvider;

pub const SYSTEM_PROMPT: &str = r#"You are a highly knowledgeable 'Cost of Living and Relocation Expert'.
Your goal is to help users compare cities, understand economic differences, and plan relocations.

Instructions:
1. USE THE CONTEXT: You will often receive "REAL-TIME DATABASE CONTEXT" with exact numbers for cities. You MUST use these numbers in your answer. Do not hallucinate numbers if they are provided.
2. BE ANALYTICAL: If the user asks about "New York vs London", compare their indices (Rent, Groceries, Purchasing Power).
3. BE HELPFUL: If no data is provided in the context, use your general knowledge but mention that specific data wasn't found in the live database.
4. TONE: Professional, objective, yet accessible.
5. FORMAT: Use bullet points for comparisons."#;

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 1024;

/// Shared connection-pooled client for all providers
pub fn build_http_client() -> Result<Client> {
    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .build()?;
    Ok(client)
}

/// Groq, Gemini and Claude, in that order
pub fn default_providers(settings: &ProviderSettings, client: &Client) -> Vec<Arc<dyn LlmProvider>> {
    vec![
        Arc::new(GroqProvider::new(
            client.clone(),
            &settings.groq_api_key,
            &settings.groq_model,
        )),
        Arc::new(GeminiProvider::new(
            client.clone(),
            &settings.gemini_api_key,
            &settings.gemini_model,
        )),
        Arc::new(ClaudeProvider::new(
            client.clone(),
            &settings.claude_api_key,
            &settings.claude_model,
        )),
    ]
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub history: Vec<ChatTurn>,
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, history: Vec<ChatTurn>) -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            history,
            message: message.into(),
        }
    }
}

/// One hosted text-generation backend
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Error: {}", self.provider, self.reason)
    }
}

impl std::error::Error for ProviderFailure {}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutcome {
    pub provider: String,
    pub result: std::result::Result<String, ProviderFailure>,
}

impl ProviderOutcome {
    pub fn success(provider: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            result: Ok(text.into()),
        }
    }

    pub fn failure(provider: impl Into<String>, reason: impl fmt::Display) -> Self {
        let provider = provider.into();
        Self {
            result: Err(ProviderFailure {
                provider: provider.clone(),
                reason: reason.to_string(),
            }),
            provider,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Answer text, or the provider-prefixed error message
    pub fn display_text(&self) -> String {
        match &self.result {
            Ok(text) => text.clone(),
            Err(failure) => failure.to_string(),
        }
    }

    pub fn to_record(&self) -> ProviderRecord {
        ProviderRecord {
            provider: self.provider.clone(),
            status: if self.is_success() {
                OutcomeStatus::Ok
            } else {
                OutcomeStatus::Error
            },
            text: self.display_text(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Error,
}

/// Serializable form of an outcome for API responses and log entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderRecord {
    pub provider: String,
    pub status: OutcomeStatus,
    pub text: String,
}

/// Body text of a non-success HTTP response, for error messages
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status, body.trim())
}
