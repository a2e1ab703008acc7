//! Common utilities and types shared across the video broker crates.

#![warn(clippy::pedantic)]

/// Module for common data types (session identifiers, roles, media modes)
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for video platform JWT claims and signing
pub mod jwt;

/// Module for RSA key fixtures used by tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_keys;
