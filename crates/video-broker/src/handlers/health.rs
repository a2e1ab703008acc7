//! Health handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Handler for GET /health
///
/// Always 200. Readiness is reported in the body: `ready` is true when all
/// four credentials are configured. This is not a live probe of the video
/// platform; `details.last_upstream_call` shows how the most recent call
/// went.
#[tracing::instrument(skip_all, name = "vb.health.report")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let report = state.health.report().await;

    if !report.ready {
        tracing::debug!(
            target: "vb.health",
            api_key_configured = report.details.api_key_configured,
            api_secret_configured = report.details.api_secret_configured,
            application_id_configured = report.details.application_id_configured,
            private_key_configured = report.details.private_key_configured,
            "Reporting not ready"
        );
    }

    Json(report)
}
