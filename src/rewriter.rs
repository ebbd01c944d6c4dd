//! [`NarrativeRewriter`] implementations.
//!
//! - **[`DisabledRewriter`]**: fails every call; used when both rewrite
//!   stages are turned off.
//! - **[`ViaragRewriter`]**: `POST {base_url}/direct_query` with
//!   `{ "prompt" }`, answering `{ "response": "..." }`.
//! - **[`OpenAIRewriter`]**: OpenAI chat completions with the prompt as a
//!   single user message.
//!
//! Use [`create_rewriter`] to pick one from configuration.
//!
//! | Config Value | Rewriter |
//! |-------------|----------|
//! | `"disabled"` | [`DisabledRewriter`] |
//! | `"viarag"` | [`ViaragRewriter`] |
//! | `"openai"` | [`OpenAIRewriter`] |

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use memory_recall_core::collaborators::NarrativeRewriter;

use crate::config::RewriteConfig;
use crate::http_client::{api_key_from_env, build_client, ensure_success, join_url};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct DisabledRewriter;

#[async_trait]
impl NarrativeRewriter for DisabledRewriter {
    async fn rewrite(&self, _prompt: &str) -> Result<String> {
        bail!("Rewriter is disabled")
    }
}

pub struct ViaragRewriter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ViaragRewriter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl NarrativeRewriter for ViaragRewriter {
    async fn rewrite(&self, prompt: &str) -> Result<String> {
        let url = join_url(&self.base_url, "direct_query");
        let mut request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "prompt": prompt }));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let response = ensure_success(response, "rewriter").await?;
        let json: serde_json::Value = response.json().await?;
        parse_direct_query_response(&json)
    }
}

/// Extract the `response` string from a `direct_query` reply.
fn parse_direct_query_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid rewriter response: missing response field"))
}

pub struct OpenAIRewriter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAIRewriter {
    pub fn new(
        base_url: Option<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: model.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl NarrativeRewriter for OpenAIRewriter {
    async fn rewrite(&self, prompt: &str) -> Result<String> {
        let url = join_url(&self.base_url, "chat/completions");
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let response = ensure_success(response, "OpenAI API").await?;
        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat completion.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Create the configured rewriter.
///
/// # Errors
///
/// Returns an error for unknown providers, missing `base_url`/`model`, or a
/// missing API key environment variable.
pub fn create_rewriter(config: &RewriteConfig) -> Result<Arc<dyn NarrativeRewriter>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledRewriter)),
        "viarag" => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("rewrite.base_url required for viarag provider"))?;
            let api_key = api_key_from_env(config.key_env())?;
            Ok(Arc::new(ViaragRewriter::new(
                base_url,
                Some(api_key),
                config.timeout_secs,
            )?))
        }
        "openai" => {
            let model = config
                .model
                .clone()
                .ok_or_else(|| anyhow!("rewrite.model required for openai provider"))?;
            let api_key = api_key_from_env(config.key_env())?;
            Ok(Arc::new(OpenAIRewriter::new(
                config.base_url.clone(),
                model,
                api_key,
                config.timeout_secs,
            )?))
        }
        other => bail!("Unknown rewrite provider: {}", other),
    }
}
