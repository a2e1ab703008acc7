//! Session service.
//!
//! Creates sessions through the video platform and answers lookups from the
//! local registry. The platform cannot be asked whether a session exists, so
//! a lookup for an id this process did not create is decided by the
//! configured [`SessionValidationPolicy`]:
//!
//! - `permissive` - a well-formed unknown id is answered with
//!   `known: false` and a warning (it may come from another instance or
//!   predate a restart). This is advisory only: `known: false` means "not
//!   known to be invalid", never "confirmed to exist".
//! - `strict` - an unknown id is rejected as not found.
//!
//! Ids that cannot be provider-issued (bad characters, over-long) are
//! rejected as not found under both policies.

use crate::config::{Config, SessionValidationPolicy};
use crate::errors::BrokerError;
use crate::models::{Session, SessionInfo};
use crate::observability::metrics::{record_session_created, record_unknown_session_lookup};
use crate::registry::SessionStore;
use crate::services::health::UpstreamTracker;
use crate::services::platform_client::VideoPlatform;
use chrono::Utc;
use common::types::{MediaMode, SessionId, SessionIdError};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Service for session creation and lookup.
pub struct SessionService {
    config: Arc<Config>,
    platform: Arc<dyn VideoPlatform>,
    store: Arc<dyn SessionStore>,
    tracker: Arc<UpstreamTracker>,
}

impl SessionService {
    pub fn new(
        config: Arc<Config>,
        platform: Arc<dyn VideoPlatform>,
        store: Arc<dyn SessionStore>,
        tracker: Arc<UpstreamTracker>,
    ) -> Self {
        Self {
            config,
            platform,
            store,
            tracker,
        }
    }

    /// Create a new session on the video platform and record it.
    ///
    /// # Arguments
    ///
    /// * `media_mode` - "routed" or "relayed"; absent or blank uses the
    ///   configured default
    ///
    /// # Errors
    ///
    /// - `BrokerError::InvalidArgument` - unknown media mode
    /// - `BrokerError::Configuration` - credentials are incomplete
    /// - `BrokerError::Upstream` - the platform call failed
    ///
    /// On any error the registry is left untouched.
    #[instrument(skip_all, name = "vb.session.create")]
    pub async fn create_session(&self, media_mode: Option<&str>) -> Result<Session, BrokerError> {
        let media_mode = match media_mode.map(str::trim).filter(|m| !m.is_empty()) {
            Some(raw) => raw.parse::<MediaMode>().map_err(|e| {
                warn!(target: "vb.services.session", error = %e, "Rejected session creation");
                record_session_created("invalid_argument");
                BrokerError::InvalidArgument(e.to_string())
            })?,
            None => self.config.default_media_mode,
        };

        if let Err(missing) = self.config.credentials.require() {
            error!(
                target: "vb.services.session",
                missing = ?missing,
                "Cannot create session: platform credentials are incomplete"
            );
            record_session_created("configuration");
            return Err(BrokerError::Configuration(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }

        let id = match self.platform.create_session(media_mode).await {
            Ok(id) => {
                self.tracker.record(true);
                id
            }
            Err(e) => {
                if !e.is_configuration() {
                    self.tracker.record(false);
                }
                let err = BrokerError::from(e);
                error!(
                    target: "vb.services.session",
                    media_mode = media_mode.as_str(),
                    error = %err,
                    "Session creation failed"
                );
                record_session_created(err.kind());
                return Err(err);
            }
        };

        let session = Session {
            id,
            created_at: Utc::now(),
            media_mode,
        };
        self.store.insert(session.clone()).await;

        info!(
            target: "vb.services.session",
            session_id = %session.id,
            media_mode = media_mode.as_str(),
            "Session created"
        );
        record_session_created("success");

        Ok(session)
    }

    /// Look up a session by id.
    ///
    /// Repeated lookups of the same id return the same verdict until a
    /// session with that id is created by this process.
    ///
    /// # Errors
    ///
    /// - `BrokerError::InvalidArgument` - empty id
    /// - `BrokerError::NotFound` - malformed id, or unknown id under the
    ///   strict policy
    #[instrument(skip_all, name = "vb.session.lookup")]
    pub async fn get_session_info(&self, raw_id: &str) -> Result<SessionInfo, BrokerError> {
        let id = match SessionId::parse(raw_id) {
            Ok(id) => id,
            Err(SessionIdError::Empty) => {
                warn!(target: "vb.services.session", "Rejected lookup: session id is empty");
                return Err(BrokerError::InvalidArgument(
                    "session id is required".to_string(),
                ));
            }
            Err(e @ SessionIdError::Malformed) => {
                warn!(
                    target: "vb.services.session",
                    id_length = raw_id.len(),
                    error = %e,
                    "Rejected lookup: session id is malformed"
                );
                return Err(BrokerError::NotFound("Video session not found".to_string()));
            }
        };

        if let Some(session) = self.store.get(&id).await {
            return Ok(SessionInfo {
                id: session.id,
                known: true,
                created_at: Some(session.created_at),
            });
        }

        let policy = self.config.session_validation_policy;
        record_unknown_session_lookup(policy.as_str());

        match policy {
            SessionValidationPolicy::Permissive => {
                warn!(
                    target: "vb.services.session",
                    session_id = %id,
                    policy = policy.as_str(),
                    "Session id not created by this instance; accepting without confirmation"
                );
                Ok(SessionInfo {
                    id,
                    known: false,
                    created_at: None,
                })
            }
            SessionValidationPolicy::Strict => {
                warn!(
                    target: "vb.services.session",
                    session_id = %id,
                    policy = policy.as_str(),
                    "Rejected lookup: session id not created by this instance"
                );
                Err(BrokerError::NotFound("Video session not found".to_string()))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::registry::InMemorySessionStore;
    use crate::services::platform_client::mock::{MockFailure, MockVideoPlatform};
    use crate::services::platform_client::{ClientTokenRequest, PlatformError};
    use common::secret::SecretString;
    use std::collections::HashMap;

    struct Fixture {
        service: SessionService,
        platform: Arc<MockVideoPlatform>,
        store: Arc<InMemorySessionStore>,
        tracker: Arc<UpstreamTracker>,
    }

    fn credential_vars() -> HashMap<String, String> {
        HashMap::from([
            ("VONAGE_API_KEY".to_string(), "47000000".to_string()),
            ("VONAGE_API_SECRET".to_string(), "secret".to_string()),
            ("VONAGE_APPLICATION_ID".to_string(), "app-123".to_string()),
            ("VONAGE_PRIVATE_KEY".to_string(), "pem".to_string()),
        ])
    }

    fn fixture_with(vars: HashMap<String, String>, platform: MockVideoPlatform) -> Fixture {
        let config = Arc::new(Config::from_vars(&vars).unwrap());
        let platform = Arc::new(platform);
        let store = Arc::new(InMemorySessionStore::new());
        let tracker = Arc::new(UpstreamTracker::new());
        let service = SessionService::new(
            config,
            Arc::clone(&platform) as Arc<dyn VideoPlatform>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::clone(&tracker),
        );
        Fixture {
            service,
            platform,
            store,
            tracker,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(credential_vars(), MockVideoPlatform::new())
    }

    fn strict_fixture() -> Fixture {
        let mut vars = credential_vars();
        vars.insert("SESSION_VALIDATION_POLICY".to_string(), "strict".to_string());
        fixture_with(vars, MockVideoPlatform::new())
    }

    #[tokio::test]
    async fn test_create_then_lookup_is_known() {
        let f = fixture();

        let session = f.service.create_session(None).await.unwrap();
        assert_eq!(session.id.as_str(), "S1");
        assert_eq!(session.media_mode, MediaMode::Routed);

        let info = f.service.get_session_info("S1").await.unwrap();
        assert!(info.known);
        assert_eq!(info.created_at, Some(session.created_at));
        assert_eq!(f.tracker.last_outcome(), crate::models::UpstreamOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_create_with_explicit_media_mode() {
        let f = fixture();

        let session = f.service.create_session(Some("Relayed")).await.unwrap();
        assert_eq!(session.media_mode, MediaMode::Relayed);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_media_mode_without_upstream_call() {
        let f = fixture();

        let result = f.service.create_session(Some("mesh")).await;

        assert!(matches!(result, Err(BrokerError::InvalidArgument(_))));
        assert_eq!(f.platform.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_registry_untouched() {
        let f = fixture_with(
            credential_vars(),
            MockVideoPlatform::failing(MockFailure::Transport),
        );

        let result = f.service.create_session(None).await;

        assert!(matches!(result, Err(BrokerError::Upstream(_))));
        assert_eq!(f.store.count().await, 0);
        assert_eq!(f.platform.create_session_calls(), 1);
        assert_eq!(f.tracker.last_outcome(), crate::models::UpstreamOutcome::Failed);
    }

    #[tokio::test]
    async fn test_create_without_credentials_is_configuration_error() {
        let mut vars = credential_vars();
        vars.remove("VONAGE_API_SECRET");
        let f = fixture_with(vars, MockVideoPlatform::new());

        let result = f.service.create_session(None).await;

        assert!(
            matches!(result, Err(BrokerError::Configuration(msg)) if msg.contains("VONAGE_API_SECRET"))
        );
        assert_eq!(f.platform.call_count(), 0);
        assert_eq!(f.tracker.last_outcome(), crate::models::UpstreamOutcome::None);
    }

    #[tokio::test]
    async fn test_create_platform_configuration_error_is_not_upstream_failure() {
        let f = fixture_with(
            credential_vars(),
            MockVideoPlatform::failing(MockFailure::MissingCredentials),
        );

        let result = f.service.create_session(None).await;

        assert!(matches!(result, Err(BrokerError::Configuration(_))));
        assert_eq!(f.tracker.last_outcome(), crate::models::UpstreamOutcome::None);
    }

    #[tokio::test]
    async fn test_lookup_unknown_permissive() {
        let f = fixture();

        let info = f.service.get_session_info("1_MX4other-instance").await.unwrap();

        assert!(!info.known);
        assert!(info.created_at.is_none());
        assert_eq!(f.platform.call_count(), 0);
    }

    #[tokio::test]
    async fn test_lookup_unknown_strict_is_not_found() {
        let f = strict_fixture();

        let result = f.service.get_session_info("1_MX4other-instance").await;

        assert!(matches!(result, Err(BrokerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_known_strict() {
        let f = strict_fixture();
        f.service.create_session(None).await.unwrap();

        assert!(f.service.get_session_info("S1").await.unwrap().known);
    }

    #[tokio::test]
    async fn test_lookup_empty_is_invalid_argument() {
        let f = fixture();

        assert!(matches!(
            f.service.get_session_info("   ").await,
            Err(BrokerError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_malformed_is_not_found_under_both_policies() {
        for f in [fixture(), strict_fixture()] {
            assert!(matches!(
                f.service.get_session_info("S1; DROP TABLE").await,
                Err(BrokerError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_lookup_is_idempotent() {
        let f = fixture();
        f.service.create_session(None).await.unwrap();

        for id in ["S1", "S-unknown"] {
            let first = f.service.get_session_info(id).await.unwrap().known;
            let second = f.service.get_session_info(id).await.unwrap().known;
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_all_recorded() {
        let f = Arc::new(fixture());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let f = Arc::clone(&f);
                tokio::spawn(async move { f.service.create_session(None).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(f.store.count().await, 32);
        assert_eq!(f.platform.create_session_calls(), 32);
    }

    /// Platform that reports a 2xx with an unusable body.
    struct MalformedPlatform;

    #[async_trait::async_trait]
    impl VideoPlatform for MalformedPlatform {
        async fn create_session(&self, _: MediaMode) -> Result<SessionId, PlatformError> {
            Err(PlatformError::InvalidResponse("empty session list".to_string()))
        }

        async fn generate_token(
            &self,
            _: &ClientTokenRequest,
        ) -> Result<SecretString, PlatformError> {
            Err(PlatformError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_malformed_platform_response_is_upstream_error() {
        let config = Arc::new(Config::from_vars(&credential_vars()).unwrap());
        let store = Arc::new(InMemorySessionStore::new());
        let service = SessionService::new(
            config,
            Arc::new(MalformedPlatform),
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(UpstreamTracker::new()),
        );

        assert!(matches!(
            service.create_session(None).await,
            Err(BrokerError::Upstream(_))
        ));
        assert_eq!(store.count().await, 0);
    }
}
