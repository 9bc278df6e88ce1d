//! Gemini `generateContent` adapter.
//!
//! Gemini has no system role in this API flavour, so system messages are
//! folded into the first user turn.

use super::provider::{transport_error, CompletionOptions, LlmError, ProviderAdapter};
use super::types::{Choice, Message, MessageRole, RawProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct GeminiAdapter {
    client: Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl GeminiAdapter {
    /// Create a new Gemini adapter.
    ///
    /// # Arguments
    /// * `api_url` - Base URL (e.g., "https://generativelanguage.googleapis.com/v1beta").
    /// * `model` - Model to use (e.g., "gemini-1.5-flash").
    /// * `api_key` - API key, sent in the `x-goog-api-key` header.
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    fn build_request(messages: &[Message], options: &CompletionOptions) -> GenerateRequest {
        let mut preamble: Vec<&str> = Vec::new();
        let mut contents: Vec<GeminiContent> = Vec::new();

        for message in messages {
            match message.role {
                MessageRole::System => preamble.push(&message.content),
                MessageRole::User | MessageRole::Assistant => {
                    let role = if message.role == MessageRole::User {
                        "user"
                    } else {
                        "model"
                    };
                    let text = if role == "user" && !preamble.is_empty() {
                        let mut text = preamble.join("\n\n");
                        text.push_str("\n\n");
                        text.push_str(&message.content);
                        preamble.clear();
                        text
                    } else {
                        message.content.clone()
                    };
                    contents.push(GeminiContent {
                        role: role.to_string(),
                        parts: vec![GeminiPart { text }],
                    });
                }
            }
        }

        // A conversation made only of system messages still has to say something.
        if !preamble.is_empty() {
            contents.push(GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: preamble.join("\n\n"),
                }],
            });
        }

        GenerateRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawProviderResponse, LlmError> {
        let request = Self::build_request(messages, options);

        debug!(model = %self.model, "Sending generateContent request to Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        generated.try_into()
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl TryFrom<GenerateResponse> for RawProviderResponse {
    type Error = LlmError;

    fn try_from(response: GenerateResponse) -> Result<Self, Self::Error> {
        if response.candidates.is_empty() {
            return Err(LlmError::InvalidResponse(
                "Gemini returned no candidates".to_string(),
            ));
        }

        let choices = response
            .candidates
            .into_iter()
            .map(|candidate| {
                let text = candidate
                    .content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .map(|part| part.text)
                            .collect::<String>()
                    })
                    .unwrap_or_default();
                Choice {
                    message: Message::assistant(text),
                }
            })
            .collect();

        Ok(RawProviderResponse { choices })
    }
}
