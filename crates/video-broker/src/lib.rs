//! Video Broker Library
//!
//! A backend broker between a browser UI and a third-party video platform.
//! It holds the platform credentials so the browser never sees them, and
//! exposes a small HTTP API to:
//!
//! - Create video sessions on the platform
//! - Look up sessions created by this process
//! - Issue role-scoped client tokens for joining a session
//! - Report whether the broker is configured
//!
//! # Architecture
//!
//! Handler -> Service -> Platform client / Registry:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> platform_client.rs
//!                                                 -> registry.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Configuration and credentials from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Domain and API data models
//! - `observability` - Prometheus metrics
//! - `registry` - In-memory session registry
//! - `routes` - Axum router setup
//! - `services` - Session, token, health and platform services

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod registry;
pub mod routes;
pub mod services;
