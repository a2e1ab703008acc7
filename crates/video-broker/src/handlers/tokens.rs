//! Token handler.
//!
//! - `GET /tokens?session_id=&identity=&role=` - Issue a client token
//!
//! `sessionId` and `username` are accepted as parameter aliases.

use crate::errors::BrokerError;
use crate::models::{TokenQuery, TokenResponse};
use crate::routes::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /tokens
///
/// # Response
///
/// - 200 OK: Token issued
/// - 400 Bad Request: Empty or malformed session id, unknown role or invalid
///   identity
/// - 404 Not Found: Session rejected by the lookup policy
/// - 500 Internal Server Error: Credentials incomplete
/// - 502 Bad Gateway: Token minting failed
#[instrument(skip_all, name = "vb.handlers.generate_token")]
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<TokenResponse>, BrokerError> {
    let Query(query) = query.map_err(|e| {
        tracing::warn!(target: "vb.handlers", error = %e, "Rejected token query string");
        BrokerError::InvalidArgument("invalid query string".to_string())
    })?;

    let issued = state.tokens.generate_token(&query).await?;

    let expires_in = u64::try_from((issued.expires_at - issued.issued_at).num_seconds())
        .unwrap_or_default();

    Ok(Json(TokenResponse {
        token: issued.token.expose_secret().to_string(),
        role: issued.role,
        identity: issued.identity,
        session_id: issued.session_id.as_str().to_string(),
        expires_in,
        expires_at: issued.expires_at,
    }))
}
