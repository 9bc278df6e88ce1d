//! OpenAI-compatible chat-completions adapter.
//!
//! Works with OpenAI, DeepSeek and any other service implementing the
//! OpenAI chat completions API. The configured URL is the full endpoint
//! (e.g. "https://api.deepseek.com/v1/chat/completions").

use super::provider::{transport_error, CompletionOptions, LlmError, ProviderAdapter};
use super::types::{Choice, Message, MessageRole, RawProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible LLM provider adapter.
pub struct OpenAiCompatibleAdapter {
    client: Client,
    name: String,
    api_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleAdapter {
    /// Create a new adapter.
    ///
    /// # Arguments
    /// * `name` - Provider identifier used in logs and failure labels.
    /// * `api_url` - Full chat-completions endpoint URL.
    /// * `model` - Model to use (e.g., "deepseek-chat", "gpt-4o-mini").
    /// * `api_key` - Bearer token for authentication.
    pub fn new(
        name: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            api_url: api_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn build_request(&self, messages: &[Message], options: &CompletionOptions) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            temperature: options.temperature,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawProviderResponse, LlmError> {
        let request = self.build_request(messages, options);

        debug!(
            provider = %self.name,
            model = %self.model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse chat completion response: {}", e))
        })?;

        debug!(
            provider = %self.name,
            choices = chat_response.choices.len(),
            "Received chat completion response"
        );

        Ok(chat_response.into())
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        ChatMessage {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    role: Option<String>,
    content: Option<String>,
}

impl From<ChatResponse> for RawProviderResponse {
    fn from(response: ChatResponse) -> Self {
        let choices = response
            .choices
            .into_iter()
            .map(|choice| {
                let role = match choice.message.role.as_deref() {
                    Some("system") => MessageRole::System,
                    Some("user") => MessageRole::User,
                    _ => MessageRole::Assistant,
                };
                Choice {
                    message: Message {
                        role,
                        content: choice.message.content.unwrap_or_default(),
                    },
                }
            })
            .collect();
        RawProviderResponse { choices }
    }
}
