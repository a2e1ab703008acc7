//! # Video Broker Test Utilities
//!
//! Shared test utilities for the video broker.
//!
//! This crate provides:
//! - Server test harness (`TestBrokerServer` for E2E tests)
//! - Configuration fixtures with a throwaway RSA key
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vb_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestBrokerServer::spawn().await?;
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/sessions", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     assert_eq!(server.mock().create_session_calls(), 1);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;

// Re-export commonly used items
pub use fixtures::*;
pub use server_harness::*;
