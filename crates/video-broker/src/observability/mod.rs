//! Observability module for the video broker.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
