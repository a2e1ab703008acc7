//! Health reporting.
//!
//! Health is a pure read of in-memory state: credential presence, the
//! outcome of the most recent platform call, and registry size. It never
//! probes the video platform, so a ready report does not mean the platform
//! is reachable right now.

use crate::config::Config;
use crate::models::{HealthDetails, HealthResponse, UpstreamOutcome};
use crate::registry::SessionStore;
use chrono::Utc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

const OUTCOME_NONE: u8 = 0;
const OUTCOME_SUCCEEDED: u8 = 1;
const OUTCOME_FAILED: u8 = 2;

/// Records the outcome of the most recent platform call.
///
/// Shared by the session and token services; last writer wins.
#[derive(Debug, Default)]
pub struct UpstreamTracker {
    last: AtomicU8,
}

impl UpstreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a platform call.
    pub fn record(&self, success: bool) {
        let value = if success {
            OUTCOME_SUCCEEDED
        } else {
            OUTCOME_FAILED
        };
        self.last.store(value, Ordering::Relaxed);
    }

    pub fn last_outcome(&self) -> UpstreamOutcome {
        match self.last.load(Ordering::Relaxed) {
            OUTCOME_SUCCEEDED => UpstreamOutcome::Succeeded,
            OUTCOME_FAILED => UpstreamOutcome::Failed,
            _ => UpstreamOutcome::None,
        }
    }
}

/// Builds health reports.
pub struct HealthService {
    config: Arc<Config>,
    store: Arc<dyn SessionStore>,
    tracker: Arc<UpstreamTracker>,
    started_at: Instant,
}

impl HealthService {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn SessionStore>,
        tracker: Arc<UpstreamTracker>,
    ) -> Self {
        Self {
            config,
            store,
            tracker,
            started_at: Instant::now(),
        }
    }

    /// Build the current health report. Never fails.
    ///
    /// `ready` depends only on credential presence, not on upstream
    /// reachability.
    pub async fn report(&self) -> HealthResponse {
        let credentials = self.config.credentials.status();
        let ready = credentials.is_complete();

        HealthResponse {
            ready,
            status: if ready { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            details: HealthDetails {
                api_key_configured: credentials.api_key_configured,
                api_secret_configured: credentials.api_secret_configured,
                application_id_configured: credentials.application_id_configured,
                private_key_configured: credentials.private_key_configured,
                last_upstream_call: self.tracker.last_outcome(),
                sessions_known: self.store.count().await,
                session_validation_policy: self
                    .config
                    .session_validation_policy
                    .as_str()
                    .to_string(),
            },
        }
    }
}
