//! LLM provider abstraction layer.
//!
//! This module provides a trait-based abstraction for LLM providers and the
//! gateway that tries them in priority order:
//! - `ProviderAdapter`: one implementation per provider wire format
//! - `ProviderGateway`: ordered failover across the configured providers
//! - `create_provider_slots`: builds the priority list from configuration

mod factory;
mod gateway;
mod gemini;
mod openai;
mod provider;
mod types;

pub use factory::{create_provider_slots, ProviderKind};
pub use gateway::{GatewayError, GatewayResponse, ProviderFailure, ProviderGateway, ProviderSlot};
pub use gemini::GeminiAdapter;
pub use openai::OpenAiCompatibleAdapter;
pub use provider::{CompletionOptions, LlmError, ProviderAdapter};
pub use types::{Choice, Message, MessageRole, RawProviderResponse};

#[cfg(test)]
pub(crate) use gateway::tests::FakeAdapter;
