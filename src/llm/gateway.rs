//! Ordered multi-provider invocation with failover.
//!
//! Providers are tried one at a time, in configured priority order. The
//! first success wins; every failure is recorded and the next provider is
//! tried. Providers are never queried in parallel.

use super::provider::{CompletionOptions, LlmError, ProviderAdapter};
use super::types::{Message, RawProviderResponse};
use crate::server::metrics;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// One entry of the configured provider priority list.
pub enum ProviderSlot {
    /// A usable adapter.
    Ready(Arc<dyn ProviderAdapter>),
    /// A known provider whose configuration is incomplete. Trying it counts
    /// as an attempt that fails.
    Misconfigured { name: String, reason: String },
    /// An identifier no adapter exists for. Skipped, not attempted.
    Unknown(String),
}

impl ProviderSlot {
    pub fn name(&self) -> &str {
        match self {
            ProviderSlot::Ready(adapter) => adapter.name(),
            ProviderSlot::Misconfigured { name, .. } => name,
            ProviderSlot::Unknown(name) => name,
        }
    }
}

/// A labeled failure of a single provider attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

impl ProviderFailure {
    fn new(provider: &str, error: &LlmError) -> Self {
        Self {
            provider: provider.to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No LLM providers configured")]
    NoProvidersConfigured,

    #[error("All {} LLM providers failed: {}", .0.len(), format_failures(.0))]
    AllProvidersFailed(Vec<ProviderFailure>),

    #[error("Provider invocation cancelled")]
    Cancelled,
}

/// Successful gateway outcome.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// Name of the provider that answered.
    pub provider: String,
    pub response: RawProviderResponse,
    /// Failures of higher-priority providers tried before the winner.
    pub failures: Vec<ProviderFailure>,
}

pub struct ProviderGateway {
    slots: Vec<ProviderSlot>,
    system_prompt: Option<String>,
    options: CompletionOptions,
}

impl ProviderGateway {
    pub fn new(slots: Vec<ProviderSlot>, options: CompletionOptions) -> Self {
        Self {
            slots,
            system_prompt: None,
            options,
        }
    }

    /// Gateway over ready adapters, in the given order.
    pub fn from_adapters(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self::new(
            adapters.into_iter().map(ProviderSlot::Ready).collect(),
            CompletionOptions::default(),
        )
    }

    /// Prepend a system message to every request.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name()).collect()
    }

    fn messages_for(&self, prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = &self.system_prompt {
            messages.push(Message::system(system_prompt.clone()));
        }
        messages.push(Message::user(prompt));
        messages
    }

    /// Invoke providers in priority order until one succeeds.
    ///
    /// No new provider call is started once `cancel` fires, and an in-flight
    /// call is abandoned.
    pub async fn invoke(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<GatewayResponse, GatewayError> {
        let messages = self.messages_for(prompt);
        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut attempted = 0usize;

        for slot in &self.slots {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let adapter = match slot {
                ProviderSlot::Unknown(name) => {
                    warn!(provider = %name, "Unknown LLM provider, skipping");
                    continue;
                }
                ProviderSlot::Misconfigured { name, reason } => {
                    attempted += 1;
                    let err = LlmError::NotConfigured(reason.clone());
                    warn!(provider = %name, error = %err, "LLM provider is not usable");
                    metrics::record_provider_attempt(name, err.kind());
                    failures.push(ProviderFailure::new(name, &err));
                    continue;
                }
                ProviderSlot::Ready(adapter) => adapter,
            };

            attempted += 1;
            info!(
                provider = %adapter.name(),
                model = %adapter.model(),
                "Requesting recommendations from LLM provider"
            );

            let started = Instant::now();
            let call = tokio::time::timeout(
                self.options.timeout,
                adapter.complete(&messages, &self.options),
            );
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                result = call => result.unwrap_or(Err(LlmError::Timeout)),
            };

            match outcome {
                Ok(response) => {
                    info!(
                        provider = %adapter.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "LLM provider answered"
                    );
                    metrics::record_provider_attempt(adapter.name(), "success");
                    return Ok(GatewayResponse {
                        provider: adapter.name().to_string(),
                        response,
                        failures,
                    });
                }
                Err(err) => {
                    warn!(
                        provider = %adapter.name(),
                        error = %err,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "LLM provider failed, trying next"
                    );
                    metrics::record_provider_attempt(adapter.name(), err.kind());
                    failures.push(ProviderFailure::new(adapter.name(), &err));
                }
            }
        }

        if attempted == 0 {
            error!("No usable LLM providers in the configured list");
            return Err(GatewayError::NoProvidersConfigured);
        }

        error!(
            failed = failures.len(),
            details = %format_failures(&failures),
            "All LLM providers failed"
        );
        Err(GatewayError::AllProvidersFailed(failures))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted adapter for gateway and pipeline tests.
    pub(crate) struct FakeAdapter {
        name: String,
        reply: Result<String, u16>,
        delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub last_messages: std::sync::Mutex<Vec<Message>>,
    }

    impl FakeAdapter {
        pub(crate) fn ok(name: &str, content: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: Ok(content.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
                last_messages: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(name: &str, status: u16) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: Err(status),
                delay: None,
                calls: AtomicUsize::new(0),
                last_messages: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn slow(name: &str, content: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: Ok(content.to_string()),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                last_messages: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing_after(name: &str, status: u16, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: Err(status),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                last_messages: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        async fn complete(
            &self,
            messages: &[Message],
            _options: &CompletionOptions,
        ) -> Result<RawProviderResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages.to_vec();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(content) => Ok(RawProviderResponse::from_text(content.clone())),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let a = FakeAdapter::ok("a", "from a");
        let b = FakeAdapter::ok("b", "from b");
        let gateway = ProviderGateway::from_adapters(vec![a.clone(), b.clone()]);

        let result = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.provider, "a");
        assert_eq!(result.response.first_content(), Some("from a"));
        assert!(result.failures.is_empty());
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let a = FakeAdapter::failing("a", 500);
        let b = FakeAdapter::ok("b", "from b");
        let gateway = ProviderGateway::from_adapters(vec![a.clone(), b.clone()]);

        let result = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.provider, "b");
        assert_eq!(result.response.first_content(), Some("from b"));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].provider, "a");
        assert_eq!(a.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_are_reported_in_order() {
        let gateway = ProviderGateway::from_adapters(vec![
            FakeAdapter::failing("a", 500),
            FakeAdapter::failing("b", 503),
        ]);

        let err = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            GatewayError::AllProvidersFailed(failures) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].provider, "a");
                assert!(failures[0].message.contains("500"));
                assert_eq!(failures[1].provider, "b");
                assert!(failures[1].message.contains("503"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_list_is_not_configured() {
        let gateway = ProviderGateway::from_adapters(vec![]);
        let err = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NoProvidersConfigured));
    }

    #[tokio::test]
    async fn test_unknown_providers_are_skipped_not_attempted() {
        let gateway = ProviderGateway::new(
            vec![ProviderSlot::Unknown("mystery".to_string())],
            CompletionOptions::default(),
        );
        let err = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NoProvidersConfigured));

        let b = FakeAdapter::ok("b", "from b");
        let gateway = ProviderGateway::new(
            vec![ProviderSlot::Unknown("mystery".to_string()), ProviderSlot::Ready(b)],
            CompletionOptions::default(),
        );
        let result = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.provider, "b");
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_misconfigured_provider_counts_as_failure() {
        let gateway = ProviderGateway::new(
            vec![ProviderSlot::Misconfigured {
                name: "openai".to_string(),
                reason: "api_key is not set".to_string(),
            }],
            CompletionOptions::default(),
        );
        let err = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            GatewayError::AllProvidersFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].message.contains("api_key is not set"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_and_next_is_tried() {
        let slow = FakeAdapter::slow("slow", "late", Duration::from_secs(5));
        let fast = FakeAdapter::ok("fast", "on time");
        let gateway = ProviderGateway::from_adapters(vec![slow, fast]).with_options(
            CompletionOptions {
                timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let result = gateway
            .invoke("prompt", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.provider, "fast");
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].message.contains("timeout"));
    }

    #[tokio::test]
    async fn test_cancelled_gateway_starts_no_calls() {
        let a = FakeAdapter::ok("a", "from a");
        let gateway = ProviderGateway::from_adapters(vec![a.clone()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gateway.invoke("prompt", &cancel).await.unwrap_err();

        assert!(matches!(err, GatewayError::Cancelled));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn test_system_prompt_is_sent_first() {
        let a = FakeAdapter::ok("a", "ok");
        let gateway =
            ProviderGateway::from_adapters(vec![a.clone()]).with_system_prompt("be an expert");

        gateway
            .invoke("recommend", &CancellationToken::new())
            .await
            .unwrap();

        let sent = a.last_messages.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Message::system("be an expert"));
        assert_eq!(sent[1], Message::user("recommend"));
    }
}
