//! Token service.
//!
//! Issues client tokens scoped to one session, one role and one identity.
//! Tokens are never stored. The only record of an issuance is an audit
//! log entry carrying the session, role, identity and a token fingerprint.
//!
//! Validation runs before anything else so that bad input never reaches
//! the video platform:
//!
//! 1. session id present and well-formed
//! 2. role known (absent means subscriber)
//! 3. identity well-formed (absent means a generated guest label)
//! 4. credentials complete
//! 5. session plausibly valid under the lookup policy

use crate::config::Config;
use crate::errors::BrokerError;
use crate::models::{IssuedToken, TokenQuery, MAX_IDENTITY_LENGTH};
use crate::observability::metrics::record_token_issued;
use crate::services::health::UpstreamTracker;
use crate::services::platform_client::{ClientTokenRequest, VideoPlatform};
use crate::services::session_service::SessionService;
use chrono::Utc;
use common::secret::token_fingerprint;
use common::types::{Role, SessionId};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Prefix of generated identities for callers that supply none.
const GUEST_IDENTITY_PREFIX: &str = "guest-";

/// Random bytes in a generated guest identity.
const GUEST_IDENTITY_RANDOM_BYTES: usize = 4;

/// Metrics label for requests whose role could not be resolved.
const INVALID_ROLE_LABEL: &str = "invalid";

/// Service for client token issuance.
pub struct TokenService {
    config: Arc<Config>,
    platform: Arc<dyn VideoPlatform>,
    sessions: Arc<SessionService>,
    tracker: Arc<UpstreamTracker>,
}

impl TokenService {
    pub fn new(
        config: Arc<Config>,
        platform: Arc<dyn VideoPlatform>,
        sessions: Arc<SessionService>,
        tracker: Arc<UpstreamTracker>,
    ) -> Self {
        Self {
            config,
            platform,
            sessions,
            tracker,
        }
    }

    /// Issue a client token.
    ///
    /// All-or-nothing: either a complete token is returned or an error.
    ///
    /// # Errors
    ///
    /// - `BrokerError::InvalidArgument` - empty or malformed session id,
    ///   unknown role or malformed identity (no platform call is made)
    /// - `BrokerError::Configuration` - credentials are incomplete
    /// - `BrokerError::NotFound` - the session is rejected by the lookup policy
    /// - `BrokerError::Upstream` - token minting failed
    #[instrument(skip_all, name = "vb.token.generate")]
    pub async fn generate_token(&self, query: &TokenQuery) -> Result<IssuedToken, BrokerError> {
        let role = Role::resolve(query.role.as_deref());
        let role_label = role.as_ref().map_or(INVALID_ROLE_LABEL, Role::as_str);

        let session_id = SessionId::parse(query.session_id.as_deref().unwrap_or_default())
            .map_err(|e| self.reject(role_label, e.to_string()))?;

        let role = role.map_err(|e| self.reject(INVALID_ROLE_LABEL, e.to_string()))?;

        let identity = normalize_identity(query.identity.as_deref())
            .map_err(|e| match e {
                BrokerError::InvalidArgument(reason) => self.reject(role.as_str(), reason),
                other => {
                    record_token_issued(role.as_str(), other.kind());
                    other
                }
            })?;

        if let Err(missing) = self.config.credentials.require() {
            error!(
                target: "vb.services.token",
                missing = ?missing,
                "Cannot issue token: platform credentials are incomplete"
            );
            record_token_issued(role.as_str(), "configuration");
            return Err(BrokerError::Configuration(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }

        // The session service logs its own rejections
        let session = self
            .sessions
            .get_session_info(session_id.as_str())
            .await
            .inspect_err(|e| record_token_issued(role.as_str(), e.kind()))?;

        let ttl = Duration::from_secs(self.config.token_ttl_seconds);
        let request = ClientTokenRequest {
            session_id: session.id,
            role,
            identity,
            ttl,
        };

        let token = match self.platform.generate_token(&request).await {
            Ok(token) => {
                self.tracker.record(true);
                token
            }
            Err(e) => {
                if !e.is_configuration() {
                    self.tracker.record(false);
                }
                let err = BrokerError::from(e);
                error!(
                    target: "vb.services.token",
                    session_id = %request.session_id,
                    role = %role,
                    error = %err,
                    "Token issuance failed"
                );
                record_token_issued(role.as_str(), err.kind());
                return Err(err);
            }
        };

        let issued_at = Utc::now();
        let expires_at = issued_at
            + chrono::Duration::from_std(ttl).map_err(|_| {
                error!(target: "vb.services.token", ttl_seconds = ttl.as_secs(), "Token TTL out of range");
                BrokerError::Internal
            })?;

        info!(
            target: "vb.audit",
            session_id = %request.session_id,
            role = %role,
            identity = %request.identity,
            known_session = session.known,
            token = %token_fingerprint(&token),
            issued_at = %issued_at,
            expires_at = %expires_at,
            "Client token issued"
        );
        record_token_issued(role.as_str(), "success");

        Ok(IssuedToken {
            token,
            session_id: request.session_id,
            role,
            identity: request.identity,
            issued_at,
            expires_at,
        })
    }

    /// Log and count a rejected request, returning the error to surface.
    fn reject(&self, role_label: &str, reason: String) -> BrokerError {
        warn!(target: "vb.services.token", reason = %reason, "Rejected token request");
        record_token_issued(role_label, "invalid_argument");
        BrokerError::InvalidArgument(reason)
    }
}

/// Trim and validate a caller-supplied identity, or generate a guest label.
fn normalize_identity(raw: Option<&str>) -> Result<String, BrokerError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();

    if trimmed.is_empty() {
        return generate_guest_identity();
    }

    if trimmed.chars().count() > MAX_IDENTITY_LENGTH {
        return Err(BrokerError::InvalidArgument(format!(
            "identity must not exceed {MAX_IDENTITY_LENGTH} characters"
        )));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(BrokerError::InvalidArgument(
            "identity must not contain control characters".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Generate an anonymous identity such as `guest-3fa9c01e`.
fn generate_guest_identity() -> Result<String, BrokerError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; GUEST_IDENTITY_RANDOM_BYTES];

    rng.fill(&mut bytes).map_err(|_| {
        error!(target: "vb.services.token", "Failed to generate random bytes");
        BrokerError::Internal
    })?;

    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{GUEST_IDENTITY_PREFIX}{suffix}"))
}
