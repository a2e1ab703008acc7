//! End-to-end tests against a scripted video platform.
//!
//! The broker runs with its real HTTP platform client pointed at a
//! `wiremock` server, and client tokens are verified with the test
//! public key.

use common::jwt::ClientTokenClaims;
use common::test_keys::TEST_RSA_PUBLIC_KEY_PEM;
use common::types::Role;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use vb_test_utils::{test_config_vars_with, TestBrokerServer, TEST_APPLICATION_ID};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLATFORM_SESSION_ID: &str = "1_MX40NzAwMDAwMH5-MTcwMDAwMDAwMDAwMH5-fn4";

async fn spawn_against(platform: &MockServer) -> Result<TestBrokerServer, anyhow::Error> {
    let base_url = platform.uri();
    TestBrokerServer::spawn_with_http_platform(test_config_vars_with(&[
        ("VIDEO_API_BASE_URL", base_url.as_str()),
        ("PLATFORM_REQUEST_TIMEOUT_SECONDS", "1"),
    ]))
    .await
}

fn session_path() -> String {
    format!("/v2/project/{TEST_APPLICATION_ID}/session")
}

/// Session creation goes through the platform REST API.
#[tokio::test]
async fn test_create_session_through_platform() -> Result<(), anyhow::Error> {
    let platform = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(session_path()))
        .and(header_exists("authorization"))
        .and(body_string_contains("p2p.preference=disabled"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"session_id": PLATFORM_SESSION_ID}])),
        )
        .expect(1)
        .mount(&platform)
        .await;

    let server = spawn_against(&platform).await?;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/sessions", server.url()))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    assert_eq!(body["id"], PLATFORM_SESSION_ID);

    Ok(())
}

/// Tokens are RS256 JWTs scoped to the session, role and identity.
#[tokio::test]
async fn test_token_is_verifiable_client_jwt() -> Result<(), anyhow::Error> {
    let platform = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(session_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"session_id": PLATFORM_SESSION_ID}])),
        )
        .mount(&platform)
        .await;

    let server = spawn_against(&platform).await?;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/sessions", server.url()))
        .send()
        .await?
        .error_for_status()?;

    let body: serde_json::Value = client
        .get(format!("{}/tokens", server.url()))
        .query(&[
            ("session_id", PLATFORM_SESSION_ID),
            ("identity", "alice"),
            ("role", "publisher"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let token = body["token"].as_str().unwrap_or_default();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let decoding = DecodingKey::from_rsa_pem(TEST_RSA_PUBLIC_KEY_PEM.as_bytes())?;
    let claims = decode::<ClientTokenClaims>(token, &decoding, &validation)?.claims;

    assert_eq!(claims.application_id, TEST_APPLICATION_ID);
    assert_eq!(claims.session_id, PLATFORM_SESSION_ID);
    assert_eq!(claims.role, Role::Publisher);
    assert_eq!(claims.data, "username=alice");
    assert_eq!(claims.scope, "session.connect");

    Ok(())
}

/// A platform error status surfaces as 502.
#[tokio::test]
async fn test_platform_error_status_is_bad_gateway() -> Result<(), anyhow::Error> {
    let platform = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&platform)
        .await;

    let server = spawn_against(&platform).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/sessions", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 502);

    Ok(())
}

/// A slow platform is cut off by the request timeout.
#[tokio::test]
async fn test_slow_platform_times_out() -> Result<(), anyhow::Error> {
    let platform = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"session_id": PLATFORM_SESSION_ID}]))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&platform)
        .await;

    let server = spawn_against(&platform).await?;
    let started = std::time::Instant::now();

    let response = reqwest::Client::new()
        .post(format!("{}/sessions", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 502);
    assert!(started.elapsed() < std::time::Duration::from_secs(4));

    Ok(())
}

/// At the largest platform timeout, a slow but successful platform call
/// still completes instead of being cut off by the inbound request timeout.
#[tokio::test]
async fn test_max_platform_timeout_outlasts_default_request_timeout() -> Result<(), anyhow::Error>
{
    let platform = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(session_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"session_id": PLATFORM_SESSION_ID}]))
                .set_delay(std::time::Duration::from_secs(32)),
        )
        .expect(1)
        .mount(&platform)
        .await;

    let base_url = platform.uri();
    let server = TestBrokerServer::spawn_with_http_platform(test_config_vars_with(&[
        ("VIDEO_API_BASE_URL", base_url.as_str()),
        ("PLATFORM_REQUEST_TIMEOUT_SECONDS", "60"),
    ]))
    .await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/sessions", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let health: serde_json::Value = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["details"]["last_upstream_call"], "succeeded");

    Ok(())
}
