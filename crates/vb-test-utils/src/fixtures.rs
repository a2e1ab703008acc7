//! Configuration fixtures.

use common::test_keys::TEST_RSA_PRIVATE_KEY_PEM;
use std::collections::HashMap;

/// API key used by test configurations.
pub const TEST_API_KEY: &str = "47000000";

/// Application id used by test configurations.
pub const TEST_APPLICATION_ID: &str = "00000000-test-app0-0000-000000000000";

/// Environment for a fully configured broker bound to a random port.
///
/// The private key is the test RSA key, so tokens minted with it verify
/// against `common::test_keys::TEST_RSA_PUBLIC_KEY_PEM`.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("VONAGE_API_KEY".to_string(), TEST_API_KEY.to_string()),
        ("VONAGE_API_SECRET".to_string(), "test-api-secret".to_string()),
        (
            "VONAGE_APPLICATION_ID".to_string(),
            TEST_APPLICATION_ID.to_string(),
        ),
        (
            "VONAGE_PRIVATE_KEY".to_string(),
            TEST_RSA_PRIVATE_KEY_PEM.to_string(),
        ),
    ])
}

/// Test environment with one variable removed.
pub fn test_config_vars_without(name: &str) -> HashMap<String, String> {
    let mut vars = test_config_vars();
    vars.remove(name);
    vars
}

/// Test environment with extra or overriding variables.
pub fn test_config_vars_with(overrides: &[(&str, &str)]) -> HashMap<String, String> {
    let mut vars = test_config_vars();
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    vars
}
