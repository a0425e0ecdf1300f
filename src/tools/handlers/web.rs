// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Web fetch tool with SSRF prevention.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::ToolError;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::tools::{parse_arguments, truncate_chars};
use crate::types::{InputSchema, ToolDefinition};

const MAX_CONTENT_CHARS: usize = 10_000;
const FETCH_TIMEOUT_SECS: u64 = 15;
const MAX_RETRIES: u32 = 1;

/// Private/loopback address patterns - SSRF prevention.
static PRIVATE_IP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^127\.",
        r"^10\.",
        r"^192\.168\.",
        r"^172\.(1[6-9]|2[0-9]|3[01])\.",
        r"^169\.254\.", // link-local
        r"^::1$",       // IPv6 loopback
        r"^fc00:",      // IPv6 unique local
        r"^fe80:",      // IPv6 link-local
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid SSRF pattern"))
    .collect()
});

const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// Reject URLs pointing at loopback, link-local or private ranges.
///
/// Runs before any network call is made.
fn check_ssrf(url: &reqwest::Url) -> Result<(), ToolError> {
    let host = url.host_str().unwrap_or("").trim_matches(['[', ']']);
    let host_lower = host.to_lowercase();

    if BLOCKED_HOSTNAMES.contains(&host_lower.as_str()) {
        warn!(%url, host, "ssrf blocked");
        return Err(ToolError::SafetyViolation(format!(
            "SSRF_BLOCKED: '{host}' is a loopback/private address"
        )));
    }

    for pattern in PRIVATE_IP_PATTERNS.iter() {
        if pattern.is_match(&host_lower) {
            warn!(%url, host, "ssrf blocked");
            return Err(ToolError::SafetyViolation(format!(
                "SSRF_BLOCKED: '{host}' is a private IP address"
            )));
        }
    }

    Ok(())
}

/// Handler for the `web_fetch` tool.
pub struct WebFetchHandler {
    client: Client,
}

impl WebFetchHandler {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent("Valet-Agent/0.1 (autonomous agent; read-only)")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for WebFetchHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WebFetchArgs {
    url: String,

    #[serde(default = "default_max_chars")]
    max_chars: usize,
}

fn default_max_chars() -> usize {
    MAX_CONTENT_CHARS
}

#[async_trait]
impl ToolHandler for WebFetchHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "web_fetch",
            "Fetch content from a public HTTPS URL. Returns text content, truncated at 10,000 chars. \
             Timeout: 15s. Private/local IPs are blocked (SSRF prevention). \
             One retry on timeout or 5xx errors.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "url",
                    serde_json::json!({
                        "type": "string",
                        "description": "Public HTTPS URL to fetch",
                        "format": "uri"
                    }),
                )
                .with_property(
                    "max_chars",
                    serde_json::json!({
                        "type": "integer",
                        "description": "Max characters to return. Default 10000.",
                        "default": 10000
                    }),
                )
                .with_required(vec!["url".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: WebFetchArgs = parse_arguments(&input)?;
        let max_chars = args.max_chars.min(MAX_CONTENT_CHARS);

        let mut url = args.url.trim().to_string();
        if url.is_empty() {
            return Ok("Error: url is required".to_string());
        }

        // Upgrade http to https
        if let Some(rest) = url.strip_prefix("http://") {
            url = format!("https://{rest}");
        }
        if !url.starts_with("https://") {
            return Ok("Error: only https:// URLs are supported".to_string());
        }

        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| ToolError::InvalidInput(format!("invalid URL: {e}")))?;
        check_ssrf(&parsed)?;

        info!(%url, "web fetch start");

        let mut retries = 0;
        loop {
            match self.client.get(parsed.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() >= 500 && retries < MAX_RETRIES {
                        retries += 1;
                        warn!(%url, status = status.as_u16(), retry = retries, "web fetch 5xx retry");
                        continue;
                    }
                    if status.as_u16() >= 400 {
                        return Ok(format!("Error: HTTP {} from {url}", status.as_u16()));
                    }

                    let content = response.text().await.unwrap_or_default();
                    let truncated = content.chars().count() > max_chars;
                    let content = truncate_chars(&content, max_chars, "\n[... content truncated]");

                    info!(
                        %url,
                        status = status.as_u16(),
                        content_len = content.len(),
                        truncated,
                        "web fetch done"
                    );
                    return Ok(content);
                }
                Err(e) if e.is_timeout() => {
                    if retries < MAX_RETRIES {
                        retries += 1;
                        warn!(%url, retry = retries, "web fetch timeout retry");
                        continue;
                    }
                    return Ok(format!(
                        "Error: request to {url} timed out after {FETCH_TIMEOUT_SECS}s"
                    ));
                }
                Err(e) => {
                    return Ok(format!("Error: request failed: {e}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ssrf_blocks_loopback() {
        for url in [
            "https://localhost/admin",
            "https://127.0.0.1/",
            "https://127.0.0.5:8080/x",
            "https://0.0.0.0/",
            "https://[::1]/",
        ] {
            let parsed = reqwest::Url::parse(url).unwrap();
            let err = check_ssrf(&parsed).unwrap_err();
            assert!(err.is_safety_violation(), "expected SSRF block for {url}");
        }
    }

    #[test]
    fn test_ssrf_blocks_private_ranges() {
        for url in [
            "https://10.0.0.1/",
            "https://192.168.1.1/",
            "https://172.16.0.1/",
            "https://172.31.255.1/",
            "https://169.254.169.254/latest/meta-data",
            "https://[fc00::1]/",
            "https://[fe80::1]/",
        ] {
            let parsed = reqwest::Url::parse(url).unwrap();
            let err = check_ssrf(&parsed).unwrap_err();
            assert!(err.is_safety_violation(), "expected SSRF block for {url}");
        }
    }

    #[test]
    fn test_ssrf_allows_public() {
        for url in [
            "https://example.com/",
            "https://172.32.0.1/", // just past the private /12
            "https://8.8.8.8/",
        ] {
            let parsed = reqwest::Url::parse(url).unwrap();
            assert!(check_ssrf(&parsed).is_ok(), "expected allow for {url}");
        }
    }

    #[tokio::test]
    async fn test_ssrf_rejected_before_network_call() {
        let handler = WebFetchHandler::new();
        let err = handler
            .execute(json!({"url": "https://192.168.1.1/"}))
            .await
            .unwrap_err();
        assert!(err.is_safety_violation());
    }

    #[tokio::test]
    async fn test_http_upgraded_then_checked() {
        let handler = WebFetchHandler::new();
        // http:// form of a private address still gets blocked post-upgrade
        let err = handler
            .execute(json!({"url": "http://10.0.0.8/"}))
            .await
            .unwrap_err();
        assert!(err.is_safety_violation());
    }

    #[tokio::test]
    async fn test_non_https_scheme_rejected() {
        let handler = WebFetchHandler::new();
        let result = handler.execute(json!({"url": "ftp://example.com/"})).await.unwrap();
        assert!(result.contains("only https://"));
    }

    #[tokio::test]
    async fn test_empty_url() {
        let handler = WebFetchHandler::new();
        let result = handler.execute(json!({"url": ""})).await.unwrap();
        assert!(result.contains("url is required"));
    }
}
