//! Shared helpers for tests against a mock GitHub server

use serde_json::{json, Value};
use wiremock::MockServer;

use crate::config::ClientConfig;
use crate::github::GitHubClient;

/// Client pointed at `server`, owner `sot`
pub(crate) fn mock_client(server: &MockServer) -> GitHubClient {
    let config = ClientConfig::new("test-token", "sot").with_api_url(server.uri());
    GitHubClient::new(&config).unwrap()
}

/// Label body as the API returns it
pub(crate) fn label_json(name: &str, color: &str) -> Value {
    json!({
        "id": 1,
        "name": name,
        "color": color,
        "description": null,
        "default": false,
        "url": format!("https://api.github.com/repos/sot/kadi/labels/{}", name)
    })
}
