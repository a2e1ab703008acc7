//! Video broker configuration.
//!
//! Configuration is loaded from environment variables once at startup and is
//! read-only afterwards. Platform credentials are optional at load time: a
//! broker with missing credentials still starts, reports not-ready on
//! `/health`, and fails session/token operations with a configuration error.
//! All sensitive fields are redacted in Debug output.

use common::jwt::{DEFAULT_CLIENT_TOKEN_TTL, MAX_CLIENT_TOKEN_TTL};
use common::secret::SecretString;
use common::types::MediaMode;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";

/// Default video platform REST base URL.
pub const DEFAULT_VIDEO_API_BASE_URL: &str = "https://video.api.vonage.com";

/// Default timeout for a single platform request in seconds.
pub const DEFAULT_PLATFORM_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the platform request timeout in seconds.
pub const MAX_PLATFORM_REQUEST_TIMEOUT_SECONDS: u64 = 60;

/// Minimum inbound request timeout in seconds.
pub const MIN_HTTP_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Time the inbound request timeout leaves after the platform timeout fires,
/// so the platform failure is reported instead of being cut off.
pub const HTTP_TIMEOUT_HEADROOM_SECONDS: u64 = 5;

/// Names of the four required credential variables, in reporting order.
pub const CREDENTIAL_ENV_VARS: [&str; 4] = [
    "VONAGE_API_KEY",
    "VONAGE_API_SECRET",
    "VONAGE_APPLICATION_ID",
    "VONAGE_PRIVATE_KEY_PATH",
];

/// What to do when asked about a session this process did not create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionValidationPolicy {
    /// Accept well-formed unknown ids (they may come from another instance)
    /// and log a warning.
    #[default]
    Permissive,
    /// Reject ids this process did not create.
    Strict,
}

impl SessionValidationPolicy {
    /// Returns the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionValidationPolicy::Permissive => "permissive",
            SessionValidationPolicy::Strict => "strict",
        }
    }
}

/// Video platform credentials.
///
/// Every field is optional; empty values are treated as absent.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Public API key (safe to hand to browser clients).
    pub api_key: Option<String>,

    /// API secret.
    pub api_secret: Option<SecretString>,

    /// Application id used as the JWT `application_id` claim.
    pub application_id: Option<String>,

    /// PEM-encoded RSA private key used to sign JWTs.
    pub private_key: Option<SecretString>,
}

/// Which credential fields are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub api_key_configured: bool,
    pub api_secret_configured: bool,
    pub application_id_configured: bool,
    pub private_key_configured: bool,
}

impl CredentialStatus {
    /// True when all four credential fields are present.
    pub fn is_complete(&self) -> bool {
        self.api_key_configured
            && self.api_secret_configured
            && self.application_id_configured
            && self.private_key_configured
    }

    /// Names of the variables that are missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let flags = [
            self.api_key_configured,
            self.api_secret_configured,
            self.application_id_configured,
            self.private_key_configured,
        ];
        CREDENTIAL_ENV_VARS
            .iter()
            .zip(flags)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Borrowed view of a complete credential set.
#[derive(Clone, Copy)]
pub struct ResolvedCredentials<'a> {
    pub api_key: &'a str,
    pub application_id: &'a str,
    pub private_key: &'a SecretString,
}

impl Credentials {
    /// Report which fields are populated.
    pub fn status(&self) -> CredentialStatus {
        CredentialStatus {
            api_key_configured: self.api_key.is_some(),
            api_secret_configured: self.api_secret.is_some(),
            application_id_configured: self.application_id.is_some(),
            private_key_configured: self.private_key.is_some(),
        }
    }

    /// Borrow the credentials needed to talk to the platform.
    ///
    /// # Errors
    ///
    /// Returns the list of missing variable names when any of the four
    /// required values is absent.
    pub fn require(&self) -> Result<ResolvedCredentials<'_>, Vec<&'static str>> {
        match (
            self.api_key.as_deref(),
            self.api_secret.as_ref(),
            self.application_id.as_deref(),
            self.private_key.as_ref(),
        ) {
            (Some(api_key), Some(_), Some(application_id), Some(private_key)) => {
                Ok(ResolvedCredentials {
                    api_key,
                    application_id,
                    private_key,
                })
            }
            _ => Err(self.status().missing()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |present: bool| if present { "[REDACTED]" } else { "[MISSING]" };
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &redacted(self.api_secret.is_some()))
            .field("application_id", &self.application_id)
            .field("private_key", &redacted(self.private_key.is_some()))
            .finish()
    }
}

/// Video broker configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "127.0.0.1:5000").
    pub bind_address: String,

    /// Video platform credentials.
    pub credentials: Credentials,

    /// Video platform REST base URL.
    pub video_api_base_url: String,

    /// Timeout for a single platform request in seconds.
    pub platform_request_timeout_seconds: u64,

    /// Lifetime of issued client tokens in seconds (default: 24 hours).
    pub token_ttl_seconds: u64,

    /// Policy for session ids this process did not create.
    pub session_validation_policy: SessionValidationPolicy,

    /// Media mode used when session creation does not specify one.
    pub default_media_mode: MediaMode,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("credentials", &self.credentials)
            .field("video_api_base_url", &self.video_api_base_url)
            .field(
                "platform_request_timeout_seconds",
                &self.platform_request_timeout_seconds,
            )
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("session_validation_policy", &self.session_validation_policy)
            .field("default_media_mode", &self.default_media_mode)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid platform request timeout configuration: {0}")]
    InvalidPlatformTimeout(String),

    #[error("Invalid token TTL configuration: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid session validation policy: {0}")]
    InvalidSessionPolicy(String),

    #[error("Invalid default media mode: {0}")]
    InvalidMediaMode(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let video_api_base_url = vars
            .get("VIDEO_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_VIDEO_API_BASE_URL.to_string());

        let credentials = Credentials {
            api_key: non_empty(vars, "VONAGE_API_KEY"),
            api_secret: non_empty(vars, "VONAGE_API_SECRET").map(SecretString::from),
            application_id: non_empty(vars, "VONAGE_APPLICATION_ID"),
            private_key: load_private_key(vars),
        };

        // Parse platform request timeout with validation
        let platform_request_timeout_seconds =
            if let Some(value_str) = vars.get("PLATFORM_REQUEST_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidPlatformTimeout(format!(
                        "PLATFORM_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidPlatformTimeout(
                        "PLATFORM_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                if value > MAX_PLATFORM_REQUEST_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidPlatformTimeout(format!(
                        "PLATFORM_REQUEST_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                        MAX_PLATFORM_REQUEST_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_PLATFORM_REQUEST_TIMEOUT_SECONDS
            };

        // Parse token TTL with validation
        let token_ttl_seconds = if let Some(value_str) = vars.get("TOKEN_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTokenTtl(format!(
                    "TOKEN_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidTokenTtl(
                    "TOKEN_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_CLIENT_TOKEN_TTL.as_secs() {
                return Err(ConfigError::InvalidTokenTtl(format!(
                    "TOKEN_TTL_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLIENT_TOKEN_TTL.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLIENT_TOKEN_TTL.as_secs()
        };

        let session_validation_policy = match vars
            .get("SESSION_VALIDATION_POLICY")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("permissive") => SessionValidationPolicy::Permissive,
            Some("strict") => SessionValidationPolicy::Strict,
            Some(other) => {
                return Err(ConfigError::InvalidSessionPolicy(format!(
                    "SESSION_VALIDATION_POLICY must be 'permissive' or 'strict', got '{}'",
                    other
                )))
            }
        };

        let default_media_mode = match vars.get("DEFAULT_MEDIA_MODE") {
            Some(value) => value
                .parse::<MediaMode>()
                .map_err(|e| ConfigError::InvalidMediaMode(e.to_string()))?,
            None => MediaMode::default(),
        };

        Ok(Config {
            bind_address,
            credentials,
            video_api_base_url,
            platform_request_timeout_seconds,
            token_ttl_seconds,
            session_validation_policy,
            default_media_mode,
        })
    }

    /// Timeout for a whole inbound request.
    ///
    /// Always longer than the platform request timeout.
    pub fn http_request_timeout(&self) -> Duration {
        let seconds = (self.platform_request_timeout_seconds + HTTP_TIMEOUT_HEADROOM_SECONDS)
            .max(MIN_HTTP_REQUEST_TIMEOUT_SECONDS);
        Duration::from_secs(seconds)
    }
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve the private key from inline PEM or from a file path.
///
/// An unreadable key file leaves the key absent rather than failing startup,
/// so the broker can still report the problem on `/health`.
fn load_private_key(vars: &HashMap<String, String>) -> Option<SecretString> {
    if let Some(pem) = non_empty(vars, "VONAGE_PRIVATE_KEY") {
        return Some(SecretString::from(pem));
    }

    let path = non_empty(vars, "VONAGE_PRIVATE_KEY_PATH")?;
    match std::fs::read_to_string(&path) {
        Ok(pem) if !pem.trim().is_empty() => Some(SecretString::from(pem)),
        Ok(_) => {
            tracing::warn!(target: "vb.config", path = %path, "Private key file is empty");
            None
        }
        Err(e) => {
            tracing::warn!(target: "vb.config", path = %path, error = %e, "Failed to read private key file");
            None
        }
    }
}
