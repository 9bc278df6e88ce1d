//! Builds the provider priority list from configuration.

use super::gateway::ProviderSlot;
use super::{GeminiAdapter, OpenAiCompatibleAdapter, ProviderAdapter};
use crate::config::{LlmSettings, ProviderEndpointSettings};
use std::sync::Arc;
use tracing::{info, warn};

/// Providers an adapter exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    DeepSeek,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::DeepSeek,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Some(ProviderKind::DeepSeek),
            "openai" => Some(ProviderKind::OpenAi),
            "gemini" => Some(ProviderKind::Gemini),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1/chat/completions",
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek-chat",
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }
}

fn create_adapter(
    kind: ProviderKind,
    endpoint: &ProviderEndpointSettings,
) -> Result<Arc<dyn ProviderAdapter>, String> {
    let api_key = match endpoint.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => return Err("api_key is not set".to_string()),
    };
    if endpoint.api_url.trim().is_empty() {
        return Err("api_url is not set".to_string());
    }

    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::DeepSeek | ProviderKind::OpenAi => Arc::new(OpenAiCompatibleAdapter::new(
            kind.name(),
            endpoint.api_url.clone(),
            endpoint.model.clone(),
            api_key,
        )),
        ProviderKind::Gemini => Arc::new(GeminiAdapter::new(
            endpoint.api_url.clone(),
            endpoint.model.clone(),
            api_key,
        )),
    };
    Ok(adapter)
}

/// Create the ordered provider slots for the configured priority list.
pub fn create_provider_slots(settings: &LlmSettings) -> Vec<ProviderSlot> {
    settings
        .providers
        .iter()
        .map(|name| {
            let Some(kind) = ProviderKind::from_name(name) else {
                warn!(provider = %name, "No adapter for configured LLM provider");
                return ProviderSlot::Unknown(name.clone());
            };
            let endpoint = settings.endpoint(kind);
            match create_adapter(kind, &endpoint) {
                Ok(adapter) => {
                    info!(provider = kind.name(), model = %endpoint.model, "LLM provider enabled");
                    ProviderSlot::Ready(adapter)
                }
                Err(reason) => {
                    warn!(provider = kind.name(), reason = %reason, "LLM provider is misconfigured");
                    ProviderSlot::Misconfigured {
                        name: kind.name().to_string(),
                        reason,
                    }
                }
            }
        })
        .collect()
}
