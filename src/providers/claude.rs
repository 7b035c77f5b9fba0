//! Anthropic messages API client

use super::{error_body, ChatRequest, LlmProvider, MAX_TOKENS};
use crate::error::AdvisorError;
use crate::history::ChatRole;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(&'a self, request: &'a ChatRequest) -> MessagesRequest<'a> {
        let mut messages: Vec<Message<'a>> = request
            .history
            .iter()
            .map(|turn| Message {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &turn.content,
            })
            .collect();

        messages.push(Message {
            role: "user",
            content: &request.message,
        });

        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &request.system_prompt,
            messages,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "Claude"
    }

    async fn complete(&self, request: &ChatRequest) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AdvisorError::Provider(
                "CLAUDE_API_KEY not configured".to_string(),
            ));
        }

        info!(model = %self.model, turns = request.history.len(), "Calling Claude API");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                error!("Claude API request failed: {}", e);
                AdvisorError::Provider(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let detail = error_body(response).await;
            error!("Claude API error response: {}", detail);
            return Err(AdvisorError::Provider(detail));
        }

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Provider(format!("parse error: {}", e)))?;

        message
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AdvisorError::Provider("empty response from Claude".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_goes_in_system_field() {
        let provider = ClaudeProvider::new(Client::new(), "key", DEFAULT_MODEL);
        let request = ChatRequest::new("Compare Paris and Pune", vec![]);

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(body["system"].as_str().unwrap().contains("Relocation Expert"));
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], 1024);
    }
}
