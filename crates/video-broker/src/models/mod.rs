//! Video broker models.
//!
//! Domain types produced by the services and the JSON request/response
//! shapes exchanged with the UI collaborator.

use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::{MediaMode, Role, SessionId};
use serde::{Deserialize, Serialize};

/// Maximum identity (display label) length.
pub const MAX_IDENTITY_LENGTH: usize = 100;

/// A session created by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Provider-assigned identifier.
    pub id: SessionId,

    /// When this broker recorded the creation (local observability only).
    pub created_at: DateTime<Utc>,

    /// Media mode requested at creation.
    pub media_mode: MediaMode,
}

/// Result of a session lookup.
///
/// `known: false` means "not known to be invalid", never "confirmed to exist".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub known: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// A freshly minted client token and the parameters it is scoped to.
///
/// Never stored. Debug output redacts the token value.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SecretString,
    pub session_id: SessionId,
    pub role: Role,
    pub identity: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// HTTP API Models
// ============================================================================

/// Optional body of `POST /sessions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// `routed` or `relayed`; defaults to the configured media mode.
    #[serde(default)]
    pub media_mode: Option<String>,
}

/// Response for session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: String,

    /// Same value as `id`, kept for the embedding UI.
    pub session_id: String,

    pub created_at: DateTime<Utc>,
    pub media_mode: MediaMode,

    /// Public API key the browser client embeds.
    pub api_key: String,

    /// Application id the browser client embeds.
    pub application_id: String,
}

/// Response for session lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfoResponse {
    pub id: String,
    pub session_id: String,

    /// True only for sessions created by this process instance.
    pub known: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    pub api_key: String,
    pub application_id: String,
}

/// Query parameters of `GET /tokens`.
///
/// Accepts both the current parameter names and the ones the original UI
/// sends (`session_id`, `username`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,

    #[serde(default, alias = "username")]
    pub identity: Option<String>,

    #[serde(default)]
    pub role: Option<String>,
}

/// Response for token issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The signed client token.
    pub token: String,

    pub role: Role,
    pub identity: String,
    pub session_id: String,

    /// Token lifetime in seconds from now.
    pub expires_in: u64,

    pub expires_at: DateTime<Utc>,
}

/// Outcome of the most recent platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamOutcome {
    /// No platform call has been made yet.
    None,
    Succeeded,
    Failed,
}

/// Detailed health information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub api_key_configured: bool,
    pub api_secret_configured: bool,
    pub application_id_configured: bool,
    pub private_key_configured: bool,
    pub last_upstream_call: UpstreamOutcome,
    pub sessions_known: usize,
    pub session_validation_policy: String,
}

/// Health check response.
///
/// Returned by `GET /health`. Built from in-memory state only; `ready: true`
/// does not mean the video platform is reachable right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ready: bool,

    /// "healthy" or "unhealthy".
    pub status: String,

    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HealthDetails,
}
