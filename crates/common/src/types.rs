//! Common data types for the video broker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum accepted length of a platform session identifier.
///
/// Provider-assigned ids are around 70-80 characters; anything far beyond
/// that cannot have come from the provider.
pub const MAX_SESSION_ID_LENGTH: usize = 512;

/// Errors produced when parsing a [`SessionId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionIdError {
    /// Identifier is missing, empty, or whitespace only.
    #[error("session id is required")]
    Empty,

    /// Identifier is too long or contains characters the provider never emits.
    #[error("session id is malformed")]
    Malformed,
}

/// Opaque session identifier assigned by the video platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Parse a caller-supplied session id.
    ///
    /// Surrounding whitespace is trimmed. The character set check only rules
    /// out ids the provider could not have produced; it says nothing about
    /// whether the session exists.
    ///
    /// # Errors
    ///
    /// - `SessionIdError::Empty` if nothing remains after trimming
    /// - `SessionIdError::Malformed` if the id is over-long or uses characters
    ///   outside the provider's alphabet
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if trimmed.len() > MAX_SESSION_ID_LENGTH || !trimmed.chars().all(is_session_id_char) {
            return Err(SessionIdError::Malformed);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_session_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '~' | '.' | '=' | '+' | '/')
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability level granted to a token holder.
///
/// `Subscriber` is the default: it can only receive streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can publish and subscribe to streams.
    Publisher,
    /// Can subscribe to streams only.
    #[default]
    Subscriber,
    /// Publisher rights plus forcing other clients to disconnect or unpublish.
    Moderator,
}

impl Role {
    /// Returns the wire representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Subscriber => "subscriber",
            Role::Moderator => "moderator",
        }
    }

    /// Resolve an optional role parameter.
    ///
    /// Absent or blank values fall back to [`Role::Subscriber`]. Explicit
    /// values that are not a known role are an error, never a downgrade.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRole` for any unrecognized explicit value.
    pub fn resolve(raw: Option<&str>) -> Result<Self, UnknownRole> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Role::default()),
            Some(value) => value.parse(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for role strings outside the closed role set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}', expected one of: publisher, subscriber, moderator")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publisher" => Ok(Role::Publisher),
            "subscriber" => Ok(Role::Subscriber),
            "moderator" => Ok(Role::Moderator),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// How media flows within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaMode {
    /// Media is routed through the provider's media servers.
    #[default]
    Routed,
    /// Clients attempt to exchange media peer-to-peer.
    Relayed,
}

impl MediaMode {
    /// Returns the wire representation of the media mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMode::Routed => "routed",
            MediaMode::Relayed => "relayed",
        }
    }

    /// Value of the provider's `p2p.preference` form field.
    #[must_use]
    pub fn p2p_preference(&self) -> &'static str {
        match self {
            MediaMode::Routed => "disabled",
            MediaMode::Relayed => "enabled",
        }
    }
}

/// Error for media mode strings other than `routed` and `relayed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown media mode '{0}', expected 'routed' or 'relayed'")]
pub struct UnknownMediaMode(pub String);

impl FromStr for MediaMode {
    type Err = UnknownMediaMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routed" => Ok(MediaMode::Routed),
            "relayed" => Ok(MediaMode::Relayed),
            _ => Err(UnknownMediaMode(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_parse_trims() {
        let id = SessionId::parse("  1_MX40NzAwMDAwMH5-fn4  ").unwrap();
        assert_eq!(id.as_str(), "1_MX40NzAwMDAwMH5-fn4");
        assert_eq!(id.to_string(), "1_MX40NzAwMDAwMH5-fn4");
    }

    #[test]
    fn test_session_id_parse_rejects_empty() {
        assert_eq!(SessionId::parse(""), Err(SessionIdError::Empty));
        assert_eq!(SessionId::parse("   "), Err(SessionIdError::Empty));
    }

    #[test]
    fn test_session_id_parse_rejects_bad_characters() {
        assert_eq!(
            SessionId::parse("abc<script>"),
            Err(SessionIdError::Malformed)
        );
        assert_eq!(SessionId::parse("a b"), Err(SessionIdError::Malformed));
    }

    #[test]
    fn test_session_id_parse_rejects_over_long() {
        let long = "a".repeat(MAX_SESSION_ID_LENGTH + 1);
        assert_eq!(SessionId::parse(&long), Err(SessionIdError::Malformed));

        let max = "a".repeat(MAX_SESSION_ID_LENGTH);
        assert!(SessionId::parse(&max).is_ok());
    }

    #[test]
    fn test_session_id_serializes_as_string() {
        let id = SessionId::parse("S1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"S1\"");
    }

    #[test]
    fn test_role_default_is_subscriber() {
        assert_eq!(Role::default(), Role::Subscriber);
        assert_eq!(Role::resolve(None).unwrap(), Role::Subscriber);
        assert_eq!(Role::resolve(Some("")).unwrap(), Role::Subscriber);
        assert_eq!(Role::resolve(Some("  ")).unwrap(), Role::Subscriber);
    }

    #[test]
    fn test_role_resolve_known_values() {
        assert_eq!(Role::resolve(Some("publisher")).unwrap(), Role::Publisher);
        assert_eq!(Role::resolve(Some("Moderator")).unwrap(), Role::Moderator);
        assert_eq!(Role::resolve(Some(" SUBSCRIBER ")).unwrap(), Role::Subscriber);
    }

    #[test]
    fn test_role_resolve_rejects_unknown() {
        let err = Role::resolve(Some("admin")).unwrap_err();
        assert_eq!(err, UnknownRole("admin".to_string()));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Publisher).unwrap(), "\"publisher\"");
        assert_eq!(serde_json::to_string(&Role::Subscriber).unwrap(), "\"subscriber\"");
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"moderator\"");
    }

    #[test]
    fn test_media_mode_parse_and_preference() {
        assert_eq!("routed".parse::<MediaMode>().unwrap(), MediaMode::Routed);
        assert_eq!("Relayed".parse::<MediaMode>().unwrap(), MediaMode::Relayed);
        assert!("mesh".parse::<MediaMode>().is_err());

        assert_eq!(MediaMode::Routed.p2p_preference(), "disabled");
        assert_eq!(MediaMode::Relayed.p2p_preference(), "enabled");
        assert_eq!(MediaMode::default(), MediaMode::Routed);
    }
}
