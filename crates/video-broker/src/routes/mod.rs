//! HTTP routes for the video broker.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::registry::SessionStore;
use crate::services::{HealthService, SessionService, TokenService, UpstreamTracker, VideoPlatform};
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Arc<Config>,

    pub sessions: Arc<SessionService>,
    pub tokens: Arc<TokenService>,
    pub health: Arc<HealthService>,
}

impl AppState {
    /// Wire the services around one platform client and one session store.
    pub fn new(
        config: Arc<Config>,
        platform: Arc<dyn VideoPlatform>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let tracker = Arc::new(UpstreamTracker::new());

        let sessions = Arc::new(SessionService::new(
            Arc::clone(&config),
            Arc::clone(&platform),
            Arc::clone(&store),
            Arc::clone(&tracker),
        ));
        let tokens = Arc::new(TokenService::new(
            Arc::clone(&config),
            platform,
            Arc::clone(&sessions),
            Arc::clone(&tracker),
        ));
        let health = Arc::new(HealthService::new(Arc::clone(&config), store, tracker));

        Self {
            config,
            sessions,
            tokens,
            health,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /sessions` - Create a session
/// - `GET /sessions/:id` - Session lookup under the validation policy
/// - `GET /tokens` - Issue a client token
/// - `GET /health` - In-memory health report (always 200)
/// - `GET /metrics` - Prometheus metrics endpoint
/// - `/api/...` aliases of the above for the original browser UI
/// - TraceLayer for request logging
/// - CORS for the browser UI (any origin)
/// - HTTP metrics middleware
/// - Request timeout that outlasts the platform timeout (at least 30 seconds)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.config.http_request_timeout();

    let api_routes = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", get(handlers::get_session))
        .route("/tokens", get(handlers::generate_token))
        .route("/health", get(handlers::health_check))
        // Aliases used by the original browser UI
        .route("/api/sessions/create", post(handlers::create_session))
        .route("/api/sessions/:id", get(handlers::get_session))
        .route("/api/tokens/generate", get(handlers::generate_token))
        .route("/api/health", get(handlers::health_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    // Layer order (first added is innermost):
    // 1. TraceLayer - Log request details
    // 2. TimeoutLayer - Timeout the request
    // 3. CorsLayer - Answer preflight requests
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}
