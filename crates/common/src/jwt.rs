//! JWT claims and signing for the video platform.
//!
//! The platform authenticates two kinds of JWT, both signed RS256 with the
//! application's private key:
//!
//! - **Application JWTs** authorize REST calls (session creation). They are
//!   short-lived and never leave this process.
//! - **Client tokens** let a browser client join one session with one role.
//!   They are minted locally; the platform verifies them at connect time.
//!
//! # Security
//!
//! - The private key is only ever borrowed as a `SecretString`
//! - The `data` claim carries the participant's display label and is redacted
//!   in Debug output
//! - Signing errors are generic and never echo key material

use crate::secret::{ExposeSecret, SecretString};
use crate::types::{Role, SessionId};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Constants
// =============================================================================

/// Lifetime of application JWTs used to authenticate REST calls.
pub const APPLICATION_JWT_TTL: Duration = Duration::from_secs(300);

/// Default client token lifetime (24 hours).
pub const DEFAULT_CLIENT_TOKEN_TTL: Duration = Duration::from_secs(86_400);

/// Maximum client token lifetime accepted by the platform (30 days).
pub const MAX_CLIENT_TOKEN_TTL: Duration = Duration::from_secs(2_592_000);

/// Scope granted to client tokens.
pub const CLIENT_TOKEN_SCOPE: &str = "session.connect";

/// Subject claim the platform expects on client tokens.
pub const CLIENT_TOKEN_SUBJECT: &str = "video";

/// ACL path granting access to session endpoints.
pub const CLIENT_TOKEN_ACL_PATH: &str = "/session/**";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while signing a platform JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The private key is not a usable RSA PEM key.
    #[error("Private key is not a valid RSA PEM key")]
    InvalidKey,

    /// Encoding or signing the token failed.
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claims of an application JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationClaims {
    /// Platform application id.
    pub application_id: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Unique token id.
    pub jti: String,
}

impl ApplicationClaims {
    /// Creates claims valid for [`APPLICATION_JWT_TTL`] from `now`.
    #[must_use]
    pub fn new(application_id: &str, now: i64) -> Self {
        Self {
            application_id: application_id.to_string(),
            iat: now,
            exp: now.saturating_add(duration_secs(APPLICATION_JWT_TTL)),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Access control list attached to client tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Path patterns mapped to per-path options (always empty objects).
    pub paths: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl Default for Acl {
    fn default() -> Self {
        let mut paths = BTreeMap::new();
        paths.insert(CLIENT_TOKEN_ACL_PATH.to_string(), serde_json::Map::new());
        Self { paths }
    }
}

/// Claims of a client token scoped to one session and one role.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientTokenClaims {
    /// Platform application id.
    pub application_id: String,

    /// Always [`CLIENT_TOKEN_SCOPE`].
    pub scope: String,

    /// Session the token admits the holder to.
    pub session_id: String,

    /// Capability level of the holder.
    pub role: Role,

    /// Connection data delivered to other participants - redacted in Debug output.
    pub data: String,

    /// Layout classes applied to the holder's streams.
    pub initial_layout_class_list: String,

    /// Always [`CLIENT_TOKEN_SUBJECT`].
    #[serde(rename = "sub")]
    pub subject: String,

    /// Access control list.
    pub acl: Acl,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Unique token id.
    pub jti: String,
}

impl fmt::Debug for ClientTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTokenClaims")
            .field("application_id", &self.application_id)
            .field("scope", &self.scope)
            .field("session_id", &self.session_id)
            .field("role", &self.role)
            .field("data", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .finish_non_exhaustive()
    }
}

impl ClientTokenClaims {
    /// Creates client token claims valid for `ttl` from `now`.
    #[must_use]
    pub fn new(
        application_id: &str,
        session_id: &SessionId,
        role: Role,
        data: String,
        ttl: Duration,
        now: i64,
    ) -> Self {
        Self {
            application_id: application_id.to_string(),
            scope: CLIENT_TOKEN_SCOPE.to_string(),
            session_id: session_id.as_str().to_string(),
            role,
            data,
            initial_layout_class_list: String::new(),
            subject: CLIENT_TOKEN_SUBJECT.to_string(),
            acl: Acl::default(),
            iat: now,
            exp: now.saturating_add(duration_secs(ttl)),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Sign `claims` with RS256 using a PEM-encoded RSA private key.
///
/// Accepts both PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) PEM.
///
/// # Errors
///
/// - `JwtError::InvalidKey` if the PEM cannot be parsed as an RSA key
/// - `JwtError::Signing` if serialization or signing fails
pub fn sign_rs256<T: Serialize>(
    claims: &T,
    private_key_pem: &SecretString,
) -> Result<SecretString, JwtError> {
    let key = EncodingKey::from_rsa_pem(private_key_pem.expose_secret().as_bytes())
        .map_err(|_| JwtError::InvalidKey)?;

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());

    encode(&header, claims, &key)
        .map(SecretString::from)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
            | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_) => JwtError::InvalidKey,
            _ => JwtError::Signing(e.to_string()),
        })
}

fn duration_secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}
