//! Sequences one recommendation run under a wall-clock budget.
//!
//! The chain runs on its own task and is raced against the budget. When the
//! budget fires first the run's cancellation token is triggered, so no new
//! provider call or catalog lookup starts, and the task's eventual outcome is
//! logged and dropped.

use super::context::fetch_context;
use super::enricher::Enricher;
use super::models::{RecommendationRequest, RecommendationResult};
use super::parser::{parse_response, ParseError};
use super::prompt::build_prompt;
use super::prompt::SYSTEM_PROMPT;
use crate::catalog::{CatalogApi, SpotifyCatalogClient};
use crate::config::AppConfig;
use crate::llm::{create_provider_slots, CompletionOptions, GatewayError, ProviderGateway};
use crate::server::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PIPELINE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Recommendation took longer than {}s", .0.as_secs_f32())]
    PipelineTimeout(Duration),

    #[error("Recommendation cancelled")]
    Cancelled,

    #[error("Recommendation task failed: {0}")]
    TaskFailed(String),
}

impl RecommendationError {
    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendationError::Gateway(GatewayError::NoProvidersConfigured) => {
                "no_providers_configured"
            }
            RecommendationError::Gateway(GatewayError::AllProvidersFailed(_)) => {
                "all_providers_failed"
            }
            RecommendationError::Gateway(GatewayError::Cancelled) => "cancelled",
            RecommendationError::Parse(ParseError::EmptyResponse) => "empty_response",
            RecommendationError::Parse(ParseError::UnparsableResponse) => "unparsable_response",
            RecommendationError::Parse(ParseError::NoRecommendations) => "no_recommendations",
            RecommendationError::Parse(ParseError::InvalidSchema(_)) => "invalid_schema",
            RecommendationError::PipelineTimeout(_) => "timeout",
            RecommendationError::Cancelled => "cancelled",
            RecommendationError::TaskFailed(_) => "task_failed",
        }
    }
}

struct Stages {
    catalog: Option<Arc<dyn CatalogApi>>,
    gateway: ProviderGateway,
    enricher: Enricher,
}

impl Stages {
    async fn execute(
        &self,
        request: RecommendationRequest,
        cancel: &CancellationToken,
    ) -> Result<RecommendationResult, RecommendationError> {
        let context = fetch_context(
            self.catalog.as_deref(),
            request.auth_token.as_ref(),
            cancel,
        )
        .await;
        let mood = request
            .mood_context
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());

        let prompt = build_prompt(context.as_ref(), mood);
        info!(
            user_id = request.user_id,
            personalized = context.is_some(),
            has_mood = mood.is_some(),
            "Built recommendation prompt"
        );

        let answer = self
            .gateway
            .invoke(&prompt, cancel)
            .await
            .map_err(|e| match e {
                GatewayError::Cancelled => RecommendationError::Cancelled,
                other => RecommendationError::Gateway(other),
            })?;

        if !answer.failures.is_empty() {
            warn!(
                user_id = request.user_id,
                provider = %answer.provider,
                failed_over = answer.failures.len(),
                details = %answer
                    .failures
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
                "Answered by a fallback LLM provider"
            );
        }

        let items = parse_response(&answer.response)?;
        info!(
            user_id = request.user_id,
            provider = %answer.provider,
            count = items.len(),
            "Parsed recommendations"
        );

        let tracks = self.enricher.enrich(items, cancel).await;
        if cancel.is_cancelled() {
            return Err(RecommendationError::Cancelled);
        }

        Ok(RecommendationResult {
            prompt_text: prompt,
            raw_provider_response: answer.response,
            provider: answer.provider,
            context_description: mood.map(str::to_string),
            tracks,
        })
    }
}

pub struct RecommendationPipeline {
    stages: Arc<Stages>,
    timeout: Duration,
}

impl RecommendationPipeline {
    /// Without a catalog client the pipeline neither personalizes prompts
    /// nor enriches results.
    pub fn new(gateway: ProviderGateway, catalog: Option<Arc<dyn CatalogApi>>) -> Self {
        let enricher = Enricher::new(catalog.clone());
        Self {
            stages: Arc::new(Stages {
                catalog,
                gateway,
                enricher,
            }),
            timeout: DEFAULT_PIPELINE_TIMEOUT,
        }
    }

    /// Wires the configured providers, in priority order, and the catalog
    /// client when credentials are present.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let gateway = ProviderGateway::new(
            create_provider_slots(&config.llm),
            CompletionOptions {
                temperature: config.pipeline.temperature,
                timeout: config.pipeline.provider_timeout,
            },
        )
        .with_system_prompt(SYSTEM_PROMPT);
        info!(providers = ?gateway.provider_names(), "LLM gateway ready");

        let catalog: Option<Arc<dyn CatalogApi>> = match &config.catalog {
            Some(settings) => {
                info!(api_url = %settings.api_url, "Catalog client configured");
                let client = SpotifyCatalogClient::new(
                    settings.client_settings(config.pipeline.catalog_timeout),
                )?;
                Some(Arc::new(client))
            }
            None => {
                info!("No catalog credentials, recommendations will not be personalized or enriched");
                None
            }
        };

        Ok(Self::new(gateway, catalog).with_timeout(config.pipeline.timeout))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the whole chain, failing with `PipelineTimeout` once the budget
    /// is exhausted. Dropping the returned future cancels the run.
    pub async fn run(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResult, RecommendationError> {
        let started = Instant::now();
        let user_id = request.user_id;
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let stages = self.stages.clone();
        let task_cancel = cancel.clone();
        let mut handle = tokio::spawn(async move { stages.execute(request, &task_cancel).await });

        let outcome = match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!(user_id, error = %join_error, "Recommendation task failed");
                Err(RecommendationError::TaskFailed(join_error.to_string()))
            }
            Err(_) => {
                cancel.cancel();
                warn!(
                    user_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Recommendation exceeded its time budget"
                );
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(_)) => debug!(user_id, "Discarded late recommendation result"),
                        Ok(Err(e)) => debug!(user_id, error = %e, "Abandoned recommendation ended"),
                        Err(e) => warn!(user_id, error = %e, "Abandoned recommendation task failed"),
                    }
                });
                Err(RecommendationError::PipelineTimeout(self.timeout))
            }
        };

        let elapsed = started.elapsed();
        match &outcome {
            Ok(result) => {
                info!(
                    user_id,
                    provider = %result.provider,
                    tracks = result.tracks.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Recommendation completed"
                );
                metrics::record_pipeline_run("success", elapsed);
            }
            Err(e) => {
                warn!(user_id, error = %e, kind = e.kind(), "Recommendation failed");
                metrics::record_pipeline_run(e.kind(), elapsed);
            }
        }
        outcome
    }
}
