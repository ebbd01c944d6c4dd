//! PostgREST (Supabase) [`MetadataStore`].
//!
//! Issues `GET {url}/rest/v1/{table}?select=*&{key_field}=eq.{value}&limit={n}`
//! with the service key sent both as `apikey` and as a bearer token.

use anyhow::{Context, Result};
use async_trait::async_trait;

use memory_recall_core::collaborators::MetadataStore;
use memory_recall_core::models::MetadataRecord;

use crate::config::StoreConfig;
use crate::http_client::{api_key_from_env, build_client, ensure_success, join_url};

pub struct PostgrestStore {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("store.url required for postgrest backend"))?;
        let api_key = api_key_from_env(&config.api_key_env)?;
        Self::new(url, api_key, config.timeout_secs)
    }
}

/// Query pairs for an equality lookup capped at `limit` rows.
fn lookup_params(key_field: &str, key_value: &str, limit: usize) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        (key_field.to_string(), format!("eq.{}", key_value)),
        ("limit".to_string(), limit.to_string()),
    ]
}

#[async_trait]
impl MetadataStore for PostgrestStore {
    async fn lookup_by_key(
        &self,
        table: &str,
        key_field: &str,
        key_value: &str,
        limit: usize,
    ) -> Result<Vec<MetadataRecord>> {
        let url = join_url(&self.url, &format!("rest/v1/{}", table));
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&lookup_params(key_field, key_value, limit))
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let response = ensure_success(response, "metadata store").await?;
        let rows: Vec<MetadataRecord> = response
            .json()
            .await
            .context("Invalid metadata store response")?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_params() {
        let params = lookup_params("file_path", "gifs/paris.gif", 1);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("file_path".to_string(), "eq.gifs/paris.gif".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }
}
