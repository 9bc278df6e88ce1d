mod file_config;

pub use file_config::{
    CatalogConfig, FileConfig, LlmConfig, PipelineConfig, ProviderEndpointConfig,
};

use crate::catalog::SpotifyClientSettings;
use crate::llm::ProviderKind;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROVIDERS: [&str; 2] = ["deepseek", "openai"];

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    // Feature configs (with defaults)
    pub pipeline: PipelineSettings,
    pub llm: LlmSettings,

    /// Present only when both client credentials are configured.
    pub catalog: Option<CatalogSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub timeout: Duration,
    pub provider_timeout: Duration,
    pub catalog_timeout: Duration,
    pub temperature: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            provider_timeout: Duration::from_secs(30),
            catalog_timeout: Duration::from_secs(30),
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpointSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

impl ProviderEndpointSettings {
    fn defaults_for(kind: ProviderKind) -> Self {
        Self {
            api_key: None,
            api_url: kind.default_api_url().to_string(),
            model: kind.default_model().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    /// Provider identifiers in priority order, as written in the config.
    pub providers: Vec<String>,
    /// Endpoint settings keyed by lowercase provider name.
    pub endpoints: BTreeMap<String, ProviderEndpointSettings>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            providers: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl LlmSettings {
    /// Endpoint settings for a provider, falling back to its defaults.
    pub fn endpoint(&self, kind: ProviderKind) -> ProviderEndpointSettings {
        self.endpoints
            .get(kind.name())
            .cloned()
            .unwrap_or_else(|| ProviderEndpointSettings::defaults_for(kind))
    }

    fn from_file(file: LlmConfig) -> Self {
        let providers = file
            .providers
            .unwrap_or_else(|| LlmSettings::default().providers);

        let endpoints = file
            .endpoints
            .into_iter()
            .filter_map(|(name, endpoint)| {
                let kind = ProviderKind::from_name(&name)?;
                let defaults = ProviderEndpointSettings::defaults_for(kind);
                let settings = ProviderEndpointSettings {
                    api_key: endpoint.api_key.filter(|k| !k.trim().is_empty()),
                    api_url: endpoint.api_url.unwrap_or(defaults.api_url),
                    model: endpoint.model.unwrap_or(defaults.model),
                };
                Some((kind.name().to_string(), settings))
            })
            .collect();

        Self {
            providers,
            endpoints,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
    pub token_url: String,
}

impl CatalogSettings {
    fn from_file(file: CatalogConfig) -> Option<Self> {
        let client_id = file.client_id.filter(|s| !s.trim().is_empty())?;
        let client_secret = file.client_secret.filter(|s| !s.trim().is_empty())?;
        let defaults = SpotifyClientSettings::default();
        Some(Self {
            client_id,
            client_secret,
            api_url: file.api_url.unwrap_or(defaults.api_url),
            token_url: file.token_url.unwrap_or(defaults.token_url),
        })
    }

    pub fn client_settings(&self, timeout: Duration) -> SpotifyClientSettings {
        SpotifyClientSettings {
            api_url: self.api_url.clone(),
            token_url: self.token_url.clone(),
            client_id: Some(self.client_id.clone()),
            client_secret: Some(self.client_secret.clone()),
            timeout,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let pipeline = resolve_pipeline(file.pipeline.unwrap_or_default())?;
        let llm = LlmSettings::from_file(file.llm.unwrap_or_default());
        let catalog = CatalogSettings::from_file(file.catalog.unwrap_or_default());

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            pipeline,
            llm,
            catalog,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join("sharetunes.db")
    }
}

fn resolve_pipeline(file: PipelineConfig) -> Result<PipelineSettings> {
    let defaults = PipelineSettings::default();

    let secs = |value: Option<u64>, key: &str, default: Duration| -> Result<Duration> {
        match value {
            Some(0) => bail!("pipeline.{} must be greater than zero", key),
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Ok(default),
        }
    };

    let temperature = file.temperature.unwrap_or(defaults.temperature);
    if !(0.0..=2.0).contains(&temperature) {
        bail!("pipeline.temperature must be between 0.0 and 2.0");
    }

    Ok(PipelineSettings {
        timeout: secs(file.timeout_secs, "timeout_secs", defaults.timeout)?,
        provider_timeout: secs(
            file.provider_timeout_secs,
            "provider_timeout_secs",
            defaults.provider_timeout,
        )?,
        catalog_timeout: secs(
            file.catalog_timeout_secs,
            "catalog_timeout_secs",
            defaults.catalog_timeout,
        )?,
        temperature,
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
