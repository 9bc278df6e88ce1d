//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database, wired to fake
//! upstream services through the same TOML config path the binary uses.

use super::constants::*;
use super::fakes::{FakeCatalogServer, FakeLlmServer};
use sharetunes_server::config::{AppConfig, CliConfig, FileConfig};
use sharetunes_server::recommendation::RecommendationPipeline;
use sharetunes_server::server::{make_app, ServerConfig, ServerState};
use sharetunes_server::store::SqliteRecommendationStore;
use sharetunes_server::RequestsLoggingLevel;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Provider names wired to fake LLM servers, in priority order.
const PROVIDER_NAMES: [&str; 2] = ["deepseek", "openai"];

pub struct TestServerBuilder<'a> {
    providers: Vec<&'a FakeLlmServer>,
    catalog: Option<&'a FakeCatalogServer>,
    pipeline_timeout_secs: u64,
}

impl<'a> TestServerBuilder<'a> {
    /// Adds the next provider in priority order.
    pub fn provider(mut self, llm: &'a FakeLlmServer) -> Self {
        assert!(
            self.providers.len() < PROVIDER_NAMES.len(),
            "At most {} fake providers are supported",
            PROVIDER_NAMES.len()
        );
        self.providers.push(llm);
        self
    }

    #[allow(dead_code)]
    pub fn catalog(mut self, catalog: &'a FakeCatalogServer) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[allow(dead_code)]
    pub fn pipeline_timeout_secs(mut self, secs: u64) -> Self {
        self.pipeline_timeout_secs = secs;
        self
    }

    fn config_toml(&self) -> String {
        let names: Vec<String> = PROVIDER_NAMES[..self.providers.len()]
            .iter()
            .map(|n| format!("\"{}\"", n))
            .collect();

        let mut toml = format!(
            "[pipeline]\ntimeout_secs = {}\nprovider_timeout_secs = 10\ncatalog_timeout_secs = 5\n\n[llm]\nproviders = [{}]\n",
            self.pipeline_timeout_secs,
            names.join(", ")
        );
        for (name, llm) in PROVIDER_NAMES.iter().zip(&self.providers) {
            toml.push_str(&format!(
                "\n[llm.{}]\napi_key = \"test-key\"\napi_url = \"{}\"\nmodel = \"test-model\"\n",
                name,
                llm.api_url()
            ));
        }
        if let Some(catalog) = self.catalog {
            toml.push_str(&format!(
                "\n[catalog]\nclient_id = \"test-client\"\nclient_secret = \"test-secret\"\napi_url = \"{}\"\ntoken_url = \"{}\"\n",
                catalog.api_url(),
                catalog.token_url()
            ));
        }
        toml
    }

    pub async fn spawn(self) -> TestServer {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");

        let cli = CliConfig {
            db_dir: Some(temp_db_dir.path().to_path_buf()),
            port: 0,
            metrics_port: 0,
            logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: None,
        };
        let file_config: FileConfig =
            toml::from_str(&self.config_toml()).expect("Invalid test config");
        let config = AppConfig::resolve(&cli, Some(file_config)).expect("Failed to resolve config");

        let store = Arc::new(
            SqliteRecommendationStore::new(config.db_path()).expect("Failed to open store"),
        );
        let pipeline =
            RecommendationPipeline::from_config(&config).expect("Failed to build pipeline");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = ServerState::new(
            ServerConfig {
                port,
                ..ServerConfig::from(&config)
            },
            Arc::new(pipeline),
            store.clone(),
            store.clone(),
        );
        let app = make_app(state);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = TestServer {
            base_url,
            port,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }
}

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    /// Store for direct database access in tests
    #[allow(dead_code)]
    pub store: Arc<SqliteRecommendationStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub fn builder<'a>() -> TestServerBuilder<'a> {
        TestServerBuilder {
            providers: Vec::new(),
            catalog: None,
            pipeline_timeout_secs: 60,
        }
    }

    /// Waits for the server to become ready by polling the stats page
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }

            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
