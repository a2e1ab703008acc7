//! Video platform client.
//!
//! Thin adapter over the provider's session and token capabilities:
//!
//! - `create_session` calls the provider REST API, authenticated with a
//!   short-lived application JWT.
//! - `generate_token` mints an RS256 client token locally with the
//!   application private key.
//!
//! The provider has no "does this session exist" query, so the adapter
//! exposes none.
//!
//! # Security
//!
//! - Credentials are read on every call and never cached in derived form
//! - Requests carry a bounded timeout so a slow provider cannot pin handlers
//! - Errors carry the cause for server-side logs; nothing is logged here
//!   (the calling service logs each failure once)
//! - No retries: a blind retry of session creation could orphan sessions

use crate::config::Credentials;
use crate::errors::BrokerError;
use crate::observability::metrics::record_platform_request;
use chrono::Utc;
use common::jwt::{sign_rs256, ApplicationClaims, ClientTokenClaims, JwtError};
use common::secret::{ExposeSecret, SecretString};
use common::types::{MediaMode, Role, SessionId};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Default connect timeout for platform requests in seconds.
const PLATFORM_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Errors returned by the platform adapter.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// One or more required credentials are absent.
    #[error("Missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    /// The configured private key cannot sign tokens.
    #[error("Configured private key is not a valid RSA PEM key")]
    InvalidPrivateKey,

    /// Signing failed for a reason other than the key.
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// The request did not complete within the configured timeout.
    #[error("Platform request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("Platform request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Platform returned status {0}")]
    Status(u16),

    /// The provider answered 2xx with an unusable body.
    #[error("Invalid platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// True when the failure is a local configuration problem rather than
    /// a provider failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PlatformError::MissingCredentials(_) | PlatformError::InvalidPrivateKey
        )
    }
}

impl From<JwtError> for PlatformError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidKey => PlatformError::InvalidPrivateKey,
            JwtError::Signing(reason) => PlatformError::Signing(reason),
        }
    }
}

impl From<PlatformError> for BrokerError {
    fn from(err: PlatformError) -> Self {
        if err.is_configuration() {
            BrokerError::Configuration(err.to_string())
        } else {
            BrokerError::Upstream(err.to_string())
        }
    }
}

/// Parameters of a client token.
#[derive(Debug, Clone)]
pub struct ClientTokenRequest {
    pub session_id: SessionId,
    pub role: Role,

    /// Display label, embedded in the token's connection data.
    pub identity: String,

    pub ttl: Duration,
}

impl ClientTokenRequest {
    /// Connection data delivered to other participants.
    pub fn connection_data(&self) -> String {
        format!("username={}", self.identity)
    }
}

/// Trait for video platform operations (enables mocking).
#[async_trait::async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Create a new session and return its provider-assigned id.
    async fn create_session(&self, media_mode: MediaMode) -> Result<SessionId, PlatformError>;

    /// Mint a client token for one session, role and identity.
    async fn generate_token(
        &self,
        request: &ClientTokenRequest,
    ) -> Result<SecretString, PlatformError>;
}

/// One element of the provider's session creation response.
#[derive(Debug, Deserialize)]
struct CreateSessionEntry {
    session_id: String,
}

/// HTTP client for the video platform.
#[derive(Clone)]
pub struct VonageVideoClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Provider REST base URL, without trailing slash.
    base_url: String,

    /// Credentials, read on every call.
    credentials: Arc<Credentials>,
}

impl VonageVideoClient {
    /// Create a new platform client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Provider REST base URL (e.g., "https://video.api.vonage.com")
    /// * `request_timeout` - Upper bound for a whole request
    /// * `credentials` - Platform credentials (may be incomplete)
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Internal` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        request_timeout: Duration,
        credentials: Arc<Credentials>,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(
                Duration::from_secs(PLATFORM_CONNECT_TIMEOUT_SECS).min(request_timeout),
            )
            .build()
            .map_err(|e| {
                error!(target: "vb.services.platform_client", error = %e, "Failed to build HTTP client");
                BrokerError::Internal
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    async fn send_create_session(&self, media_mode: MediaMode) -> Result<SessionId, PlatformError> {
        let creds = self
            .credentials
            .require()
            .map_err(PlatformError::MissingCredentials)?;

        let claims = ApplicationClaims::new(creds.application_id, Utc::now().timestamp());
        let jwt = sign_rs256(&claims, creds.private_key)?;

        let url = format!(
            "{}/v2/project/{}/session",
            self.base_url, creds.application_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(jwt.expose_secret())
            .header("Accept", "application/json")
            .form(&[
                ("archiveMode", "manual"),
                ("p2p.preference", media_mode.p2p_preference()),
            ])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Status(status.as_u16()));
        }

        let entries: Vec<CreateSessionEntry> = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::InvalidResponse("empty session list".to_string()))?;

        SessionId::parse(&entry.session_id)
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }
}

fn classify_transport_error(err: reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Timeout
    } else {
        PlatformError::Transport(err.to_string())
    }
}

#[async_trait::async_trait]
impl VideoPlatform for VonageVideoClient {
    #[instrument(
        skip(self),
        name = "vb.platform.create_session",
        fields(media_mode = media_mode.as_str())
    )]
    async fn create_session(&self, media_mode: MediaMode) -> Result<SessionId, PlatformError> {
        let start = Instant::now();
        let result = self.send_create_session(media_mode).await;
        record_platform_request("create_session", result.is_ok(), start.elapsed());

        if let Ok(id) = &result {
            debug!(target: "vb.services.platform_client", session_id = %id, "Platform created session");
        }
        result
    }

    #[instrument(
        skip(self, request),
        name = "vb.platform.generate_token",
        fields(session_id = %request.session_id, role = %request.role)
    )]
    async fn generate_token(
        &self,
        request: &ClientTokenRequest,
    ) -> Result<SecretString, PlatformError> {
        let start = Instant::now();
        let result = self
            .credentials
            .require()
            .map_err(PlatformError::MissingCredentials)
            .and_then(|creds| {
                let claims = ClientTokenClaims::new(
                    creds.application_id,
                    &request.session_id,
                    request.role,
                    request.connection_data(),
                    request.ttl,
                    Utc::now().timestamp(),
                );
                sign_rs256(&claims, creds.private_key).map_err(PlatformError::from)
            });
        record_platform_request("generate_token", result.is_ok(), start.elapsed());
        result
    }
}

/// Mock platform client module for testing.
///
/// This module provides a mock implementation of the platform client for use
/// in tests. It hands out sequential session ids (`S1`, `S2`, ...) and
/// counts every call so tests can assert that no upstream call was made.
pub mod mock {

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// How a mock call fails.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockFailure {
        /// Simulate an unreachable provider.
        Transport,
        /// Simulate absent credentials.
        MissingCredentials,
    }

    /// Mock video platform for unit and integration testing.
    pub struct MockVideoPlatform {
        failure: Option<MockFailure>,
        failing: AtomicBool,
        create_calls: AtomicUsize,
        token_calls: AtomicUsize,
    }

    impl MockVideoPlatform {
        /// Create a mock that always succeeds.
        pub fn new() -> Self {
            Self {
                failure: None,
                failing: AtomicBool::new(false),
                create_calls: AtomicUsize::new(0),
                token_calls: AtomicUsize::new(0),
            }
        }

        /// Create a mock that fails every call with `failure`.
        pub fn failing(failure: MockFailure) -> Self {
            Self {
                failure: Some(failure),
                failing: AtomicBool::new(true),
                ..Self::new()
            }
        }

        /// Switch transport failures on or off for subsequent calls.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Number of `create_session` calls made.
        pub fn create_session_calls(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }

        /// Number of `generate_token` calls made.
        pub fn generate_token_calls(&self) -> usize {
            self.token_calls.load(Ordering::SeqCst)
        }

        /// Total number of calls made.
        pub fn call_count(&self) -> usize {
            self.create_session_calls() + self.generate_token_calls()
        }

        fn current_failure(&self) -> Option<PlatformError> {
            if !self.failing.load(Ordering::SeqCst) {
                return None;
            }
            match self.failure.unwrap_or(MockFailure::Transport) {
                MockFailure::Transport => Some(PlatformError::Transport(
                    "Mock platform unavailable".to_string(),
                )),
                MockFailure::MissingCredentials => {
                    Some(PlatformError::MissingCredentials(vec!["VONAGE_API_KEY"]))
                }
            }
        }
    }

    impl Default for MockVideoPlatform {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl VideoPlatform for MockVideoPlatform {
        async fn create_session(&self, _media_mode: MediaMode) -> Result<SessionId, PlatformError> {
            let count = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(err) = self.current_failure() {
                return Err(err);
            }

            SessionId::parse(&format!("S{count}"))
                .map_err(|e| PlatformError::InvalidResponse(e.to_string()))
        }

        async fn generate_token(
            &self,
            request: &ClientTokenRequest,
        ) -> Result<SecretString, PlatformError> {
            let count = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(err) = self.current_failure() {
                return Err(err);
            }

            Ok(SecretString::from(format!(
                "mock-token.{}.{}.{}",
                request.session_id, request.role, count
            )))
        }
    }

}
