//! HTTP request handlers for the video broker.

pub mod health;
pub mod metrics;
pub mod sessions;
pub mod tokens;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use sessions::{create_session, get_session};
pub use tokens::generate_token;
