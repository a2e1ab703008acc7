//! Session handlers.
//!
//! - `POST /sessions` - Create a session (optional JSON body `{"media_mode"}`)
//! - `GET /sessions/:id` - Look up a session
//!
//! Both responses carry the public API key and application id so the
//! browser client can connect without its own configuration.

use crate::config::Credentials;
use crate::errors::BrokerError;
use crate::models::{CreateSessionRequest, CreateSessionResponse, SessionInfoResponse};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /sessions
///
/// # Response
///
/// - 200 OK: Session created
/// - 400 Bad Request: Malformed body or unknown media mode
/// - 500 Internal Server Error: Credentials incomplete
/// - 502 Bad Gateway: Video platform call failed
#[instrument(skip_all, name = "vb.handlers.create_session")]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CreateSessionResponse>, BrokerError> {
    let request = parse_create_request(&body)?;

    let session = state
        .sessions
        .create_session(request.media_mode.as_deref())
        .await?;

    let (api_key, application_id) = public_identifiers(&state.config.credentials);
    let id = session.id.as_str().to_string();

    Ok(Json(CreateSessionResponse {
        session_id: id.clone(),
        id,
        created_at: session.created_at,
        media_mode: session.media_mode,
        api_key,
        application_id,
    }))
}

/// Handler for GET /sessions/:id
///
/// `known: false` means the id was not created by this instance and was
/// accepted under the permissive policy; it is not a confirmation that the
/// session exists.
///
/// # Response
///
/// - 200 OK: Session info
/// - 400 Bad Request: Empty id
/// - 404 Not Found: Malformed id, or unknown id under the strict policy
#[instrument(skip_all, name = "vb.handlers.get_session")]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfoResponse>, BrokerError> {
    let info = state.sessions.get_session_info(&id).await?;

    let (api_key, application_id) = public_identifiers(&state.config.credentials);
    let id = info.id.as_str().to_string();

    Ok(Json(SessionInfoResponse {
        session_id: id.clone(),
        id,
        known: info.known,
        created_at: info.created_at,
        api_key,
        application_id,
    }))
}

/// An empty body means "use the defaults".
fn parse_create_request(body: &[u8]) -> Result<CreateSessionRequest, BrokerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateSessionRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(target: "vb.handlers", error = %e, "Rejected session creation body");
        BrokerError::InvalidArgument("request body must be a JSON object".to_string())
    })
}

fn public_identifiers(credentials: &Credentials) -> (String, String) {
    (
        credentials.api_key.clone().unwrap_or_default(),
        credentials.application_id.clone().unwrap_or_default(),
    )
}
