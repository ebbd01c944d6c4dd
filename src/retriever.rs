//! HTTP [`ContextRetriever`] for a hosted vector memory service.
//!
//! Calls `POST {base_url}/match_context` with `{ "query", "top_k" }` and a
//! bearer key. The service may answer with a bare JSON array of fragments
//! or with `{ "matches": [...] }`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use memory_recall_core::collaborators::ContextRetriever;
use memory_recall_core::models::ContextFragment;

use crate::config::RetrieverConfig;
use crate::http_client::{api_key_from_env, build_client, ensure_success, join_url};

pub struct HttpRetriever {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MatchResponse {
    Bare(Vec<ContextFragment>),
    Wrapped { matches: Vec<ContextFragment> },
}

impl MatchResponse {
    fn into_fragments(self) -> Vec<ContextFragment> {
        match self {
            MatchResponse::Bare(fragments) | MatchResponse::Wrapped { matches: fragments } => {
                fragments
            }
        }
    }
}

impl HttpRetriever {
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

    /// Build from config, reading the API key from `api_key_env`.
    pub fn from_config(config: &RetrieverConfig) -> Result<Self> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        Self::new(config.base_url.clone(), Some(api_key), config.timeout_secs)
    }
}

#[async_trait]
impl ContextRetriever for HttpRetriever {
    async fn match_context(&self, query: &str, top_k: usize) -> Result<Vec<ContextFragment>> {
        let url = join_url(&self.base_url, "match_context");
        let mut request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "query": query, "top_k": top_k }));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let response = ensure_success(response, "retriever").await?;
        let parsed: MatchResponse = response
            .json()
            .await
            .context("Invalid retriever response")?;
        Ok(parsed.into_fragments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let parsed: MatchResponse = serde_json::from_str(
            r#"[{"score": 0.8, "metadata": {"gif_path": "a.gif"}}, {"metadata": {}}]"#,
        )
        .unwrap();
        let frags = parsed.into_fragments();
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].item_key("gif_path").as_deref(), Some("a.gif"));
        assert_eq!(frags[1].score, 0.0);
    }

    #[test]
    fn test_parse_wrapped_matches() {
        let parsed: MatchResponse =
            serde_json::from_str(r#"{"matches": [{"score": 0.5, "metadata": {}}]}"#).unwrap();
        assert_eq!(parsed.into_fragments().len(), 1);
    }
}
