//! Shared fixtures for router and handler tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum_test::TestServer;
use url::Url;

use crate::config::{ClerkConfig, Config, TriggerConfig};
use crate::webhooks::{WorkflowDispatcher, sign_payload};
use crate::{AppState, build_router};

pub const TEST_SIGNING_SECRET: &str = "whsec_dGVzdHNlY3JldA==";

/// A config with two triggers: `signups` admits every event, `orgs` only `organization.created`.
pub fn create_test_config() -> Config {
    let mut triggers = BTreeMap::new();
    triggers.insert(
        "signups".to_string(),
        TriggerConfig {
            signing_secret: TEST_SIGNING_SECRET.to_string(),
            ..Default::default()
        },
    );
    triggers.insert(
        "orgs".to_string(),
        TriggerConfig {
            signing_secret: TEST_SIGNING_SECRET.to_string(),
            events: vec!["organization.created".to_string()],
            ..Default::default()
        },
    );

    Config {
        clerk: ClerkConfig {
            secret_key: "sk_test_123".to_string(),
            ..Default::default()
        },
        triggers,
        ..Default::default()
    }
}

/// Point the Clerk client at a mock server.
pub fn with_clerk_base_url(mut config: Config, server_uri: &str) -> Config {
    config.clerk.base_url = Url::parse(&format!("{server_uri}/v1")).expect("valid mock server url");
    config
}

pub fn create_test_server(config: Config, dispatcher: Arc<dyn WorkflowDispatcher>) -> TestServer {
    let state = AppState::from_config(config, dispatcher).expect("Failed to build app state");
    TestServer::new(build_router(state)).expect("Failed to create test server")
}

/// `(svix-id, svix-timestamp, svix-signature)` header values for a body signed at `timestamp`.
pub fn svix_headers(msg_id: &str, timestamp: i64, body: &str) -> [(&'static str, String); 3] {
    let signature = sign_payload(msg_id, timestamp, body, TEST_SIGNING_SECRET).expect("test secret decodes");
    [
        ("svix-id", msg_id.to_string()),
        ("svix-timestamp", timestamp.to_string()),
        ("svix-signature", signature),
    ]
}
