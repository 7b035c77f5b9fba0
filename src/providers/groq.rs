//! Groq client (OpenAI-compatible chat completions)

use super::{error_body, ChatRequest, LlmProvider, MAX_TOKENS, TEMPERATURE};
use crate::error::AdvisorError;
use crate::history::ChatRole;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqProvider {
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

    fn build_request<'a>(&'a self, request: &'a ChatRequest) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(Message {
            role: "system",
            content: &request.system_prompt,
        });

        for turn in &request.history {
            messages.push(Message {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &turn.content,
            });
        }

        messages.push(Message {
            role: "user",
            content: &request.message,
        });

        CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn complete(&self, request: &ChatRequest) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AdvisorError::Provider(
                "GROQ_API_KEY not configured".to_string(),
            ));
        }

        info!(model = %self.model, turns = request.history.len(), "Calling Groq API");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                error!("Groq API request failed: {}", e);
                AdvisorError::Provider(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let detail = error_body(response).await;
            error!("Groq API error response: {}", detail);
            return Err(AdvisorError::Provider(detail));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Provider(format!("parse error: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AdvisorError::Provider("empty response from Groq".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ChatTurn;

    #[test]
    fn test_system_prompt_leads_messages() {
        let provider = GroqProvider::new(Client::new(), "key", DEFAULT_MODEL);
        let request = ChatRequest::new("Rent in Pune?", vec![ChatTurn::assistant("Hello")]);

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "Rent in Pune?");
        assert_eq!(body["model"], DEFAULT_MODEL);
    }
}
