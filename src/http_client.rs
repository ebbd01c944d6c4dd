//! Shared plumbing for the HTTP collaborator clients.
//!
//! No retries happen here: a failed call surfaces immediately and the
//! request that issued it fails as a whole.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

/// Build a `reqwest` client with a per-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Read an API key from the environment.
pub fn api_key_from_env(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| anyhow!("{} environment variable not set", var))
}

/// Pass a successful response through; turn anything else into an error
/// carrying the status and response body.
pub async fn ensure_success(
    response: reqwest::Response,
    service: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body_text = response.text().await.unwrap_or_default();
    bail!("{} error {}: {}", service, status, body_text);
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/", "/a"), "http://h/a");
        assert_eq!(join_url("http://h", "a"), "http://h/a");
        assert_eq!(join_url("http://h/api/", "rest/v1/t"), "http://h/api/rest/v1/t");
    }
}
