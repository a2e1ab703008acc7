//! Metrics definitions for the video broker.
//!
//! All metrics follow Prometheus naming conventions:
//! - `vb_` prefix for the video broker
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: ~10 values (parameterized paths)
//! - `status`: 3 values (success, error, timeout)
//! - `role`: 3 values (publisher, subscriber, moderator) plus "invalid"
//! - `operation`: 2 values (create_session, generate_token)
//! - `error_type`: bounded by `BrokerError` variants
//!
//! Session ids, identities and tokens are never used as label values.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("vb_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Platform calls are bounded by the configured request timeout (max 60s)
        .set_buckets_for_metric(
            Matcher::Prefix("vb_platform_request".to_string()),
            &[
                0.001, 0.005, 0.025, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000, 30.000,
                60.000,
            ],
        )
        .map_err(|e| format!("Failed to set platform request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `vb_http_requests_total`, `vb_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures framework-level rejections (404, 405, query parse errors) as
/// well as handler responses.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("vb_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("vb_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Session ids in lookup paths are replaced with a placeholder.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/sessions" | "/tokens" | "/api/health"
        | "/api/sessions/create" | "/api/tokens/generate" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["sessions", id] if !id.is_empty() => "/sessions/{id}".to_string(),
        ["api", "sessions", id] if !id.is_empty() => "/api/sessions/{id}".to_string(),
        // Unknown paths normalized to "/other" to bound cardinality
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Record a session creation attempt.
///
/// Metric: `vb_sessions_created_total`
/// Labels: `status` ("success" or the error kind)
pub fn record_session_created(status: &str) {
    counter!("vb_sessions_created_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a lookup of a session this process did not create.
///
/// Metric: `vb_unknown_session_lookups_total`
/// Labels: `policy` ("permissive" or "strict")
pub fn record_unknown_session_lookup(policy: &str) {
    counter!("vb_unknown_session_lookups_total",
        "policy" => policy.to_string()
    )
    .increment(1);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token issuance attempt.
///
/// Metric: `vb_tokens_issued_total`
/// Labels: `role`, `status` ("success" or the error kind)
pub fn record_token_issued(role: &str, status: &str) {
    counter!("vb_tokens_issued_total",
        "role" => role.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Platform Client Metrics
// ============================================================================

/// Record a video platform call.
///
/// Metric: `vb_platform_request_duration_seconds`, `vb_platform_requests_total`
/// Labels: `operation`, `status`
pub fn record_platform_request(operation: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };

    histogram!("vb_platform_request_duration_seconds",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("vb_platform_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    /// Run `f` against a local recorder and return the counter values by
    /// metric name and label set.
    fn capture_counters(f: impl FnOnce()) -> Vec<(String, Vec<(String, String)>, u64)> {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, f);

        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count) => {
                    let labels = key
                        .key()
                        .labels()
                        .map(|l| (l.key().to_string(), l.value().to_string()))
                        .collect();
                    Some((key.key().name().to_string(), labels, count))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("POST", "/sessions", 200, Duration::from_millis(120));
        record_http_request("GET", "/sessions/1_MX4abc", 200, Duration::from_millis(1));
        record_http_request("GET", "/tokens", 400, Duration::from_millis(1));
        record_http_request("POST", "/sessions", 502, Duration::from_secs(10));
        record_http_request("GET", "/tokens", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(500), "error");
        assert_eq!(categorize_status_code(502), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_endpoint_static_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/sessions"), "/sessions");
        assert_eq!(normalize_endpoint("/tokens"), "/tokens");
        assert_eq!(normalize_endpoint("/api/sessions/create"), "/api/sessions/create");
        assert_eq!(normalize_endpoint("/api/tokens/generate"), "/api/tokens/generate");
        assert_eq!(normalize_endpoint("/api/health"), "/api/health");
    }

    #[test]
    fn test_normalize_endpoint_session_ids() {
        assert_eq!(normalize_endpoint("/sessions/S1"), "/sessions/{id}");
        assert_eq!(
            normalize_endpoint("/sessions/1_MX40NzAwMDAwMH5-fn4"),
            "/sessions/{id}"
        );
        assert_eq!(normalize_endpoint("/api/sessions/S1"), "/api/sessions/{id}");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/sessions/"), "/other");
        assert_eq!(normalize_endpoint("/sessions/S1/extra"), "/other");
        assert_eq!(normalize_endpoint("/admin"), "/other");
    }

    #[test]
    fn test_session_and_token_counters() {
        let counters = capture_counters(|| {
            record_session_created("success");
            record_session_created("success");
            record_session_created("upstream");
            record_token_issued("publisher", "success");
            record_unknown_session_lookup("permissive");
        });

        let find = |name: &str, label: (&str, &str)| {
            counters
                .iter()
                .find(|(n, labels, _)| {
                    n == name
                        && labels
                            .iter()
                            .any(|(k, v)| k == label.0 && v == label.1)
                })
                .map(|(_, _, count)| *count)
        };

        assert_eq!(find("vb_sessions_created_total", ("status", "success")), Some(2));
        assert_eq!(find("vb_sessions_created_total", ("status", "upstream")), Some(1));
        assert_eq!(find("vb_tokens_issued_total", ("role", "publisher")), Some(1));
        assert_eq!(
            find("vb_unknown_session_lookups_total", ("policy", "permissive")),
            Some(1)
        );
    }

    #[test]
    fn test_platform_request_counter_labels() {
        let counters = capture_counters(|| {
            record_platform_request("create_session", true, Duration::from_millis(80));
            record_platform_request("create_session", false, Duration::from_secs(10));
        });

        let platform: Vec<_> = counters
            .iter()
            .filter(|(name, _, _)| name == "vb_platform_requests_total")
            .collect();
        assert_eq!(platform.len(), 2);
        assert!(platform
            .iter()
            .all(|(_, labels, count)| *count == 1
                && labels.iter().any(|(k, v)| k == "operation" && v == "create_session")));
    }
}
