//! Service layer for the video broker.
//!
//! # Components
//!
//! - `platform_client` - adapter over the video platform (REST + token signing)
//! - `session_service` - session creation and lookup policy
//! - `token_service` - client token issuance
//! - `health` - in-memory health reporting

pub mod health;
pub mod platform_client;
pub mod session_service;
pub mod token_service;

pub use health::{HealthService, UpstreamTracker};
pub use platform_client::{VideoPlatform, VonageVideoClient};
pub use session_service::SessionService;
pub use token_service::TokenService;
// Mock platform for testing (exposed for integration tests)
#[allow(unused_imports)]
pub use platform_client::mock::MockVideoPlatform;
