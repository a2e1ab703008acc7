//! Test server harness for E2E testing
//!
//! Provides `TestBrokerServer` for spawning real broker instances in tests.

use crate::fixtures::test_config_vars;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use video_broker::config::Config;
use video_broker::observability::metrics::init_metrics_recorder;
use video_broker::registry::InMemorySessionStore;
use video_broker::routes::{self, AppState};
use video_broker::services::{MockVideoPlatform, VideoPlatform, VonageVideoClient};

static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Shared metrics handle; the global recorder can only be installed once
/// per process.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the video broker in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let server = TestBrokerServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestBrokerServer {
    addr: SocketAddr,
    config: Arc<Config>,
    mock: Option<Arc<MockVideoPlatform>>,
    _handle: JoinHandle<()>,
}

impl TestBrokerServer {
    /// Spawn a fully configured server backed by a [`MockVideoPlatform`].
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(test_config_vars()).await
    }

    /// Spawn a server with the given environment and a fresh mock platform.
    pub async fn spawn_with_vars(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_mock(vars, Arc::new(MockVideoPlatform::new())).await
    }

    /// Spawn a server with the given environment and mock platform.
    pub async fn spawn_with_mock(
        vars: HashMap<String, String>,
        mock: Arc<MockVideoPlatform>,
    ) -> Result<Self, anyhow::Error> {
        let config = build_config(&vars)?;
        let platform: Arc<dyn VideoPlatform> = Arc::clone(&mock) as Arc<dyn VideoPlatform>;
        Self::start(config, platform, Some(mock)).await
    }

    /// Spawn a server that talks to the platform over HTTP.
    ///
    /// Point `VIDEO_API_BASE_URL` at a `wiremock::MockServer` to script the
    /// platform's responses.
    pub async fn spawn_with_http_platform(
        vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let config = build_config(&vars)?;
        let client = VonageVideoClient::new(
            config.video_api_base_url.clone(),
            Duration::from_secs(config.platform_request_timeout_seconds),
            Arc::new(config.credentials.clone()),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create platform client: {}", e))?;

        Self::start(config, Arc::new(client), None).await
    }

    async fn start(
        config: Arc<Config>,
        platform: Arc<dyn VideoPlatform>,
        mock: Option<Arc<MockVideoPlatform>>,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::new(
            Arc::clone(&config),
            platform,
            Arc::new(InMemorySessionStore::new()),
        ));

        // Build routes using the broker's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            mock,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the mock platform for call-count assertions.
    ///
    /// # Panics
    ///
    /// Panics if the server was spawned with an HTTP platform client.
    pub fn mock(&self) -> &MockVideoPlatform {
        self.mock
            .as_deref()
            .expect("server was not spawned with a mock platform")
    }
}

impl Drop for TestBrokerServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends
        self._handle.abort();
    }
}

fn build_config(vars: &HashMap<String, String>) -> Result<Arc<Config>, anyhow::Error> {
    Config::from_vars(vars)
        .map(Arc::new)
        .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}
