//! In-process collaborator implementations for tests and embedding.
//!
//! Each type records how it was called so tests can assert on stage
//! ordering (e.g. that no store lookup happened after a failed vote).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::collaborators::{ContextRetriever, MetadataStore, NarrativeRewriter};
use crate::models::{ContextFragment, MetadataRecord};

/// Retriever that returns a fixed fragment list, truncated to `top_k`.
pub struct InMemoryRetriever {
    fragments: Vec<ContextFragment>,
    failure: Option<String>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl InMemoryRetriever {
    pub fn new(fragments: Vec<ContextFragment>) -> Self {
        Self {
            fragments,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A retriever whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fragments: Vec::new(),
            failure: Some(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(query, top_k)` for every call received, in order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ContextRetriever for InMemoryRetriever {
    async fn match_context(&self, query: &str, top_k: usize) -> Result<Vec<ContextFragment>> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("retriever call log poisoned"))?
            .push((query.to_string(), top_k));
        if let Some(ref msg) = self.failure {
            bail!("{}", msg);
        }
        Ok(self.fragments.iter().take(top_k).cloned().collect())
    }
}

/// Table-scoped record store backed by a `HashMap`.
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<MetadataRecord>>>,
    failure: Option<String>,
    lookups: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            failure: None,
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// A store whose every lookup fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn insert(&self, table: &str, record: MetadataRecord) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table.to_string())
            .or_default()
            .push(record);
    }

    /// Key values looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryStore {
    async fn lookup_by_key(
        &self,
        table: &str,
        key_field: &str,
        key_value: &str,
        limit: usize,
    ) -> Result<Vec<MetadataRecord>> {
        self.lookups
            .lock()
            .map_err(|_| anyhow!("store lookup log poisoned"))?
            .push(key_value.to_string());
        if let Some(ref msg) = self.failure {
            bail!("{}", msg);
        }
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("store tables poisoned"))?;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|r| r.get(key_field).and_then(Value::as_str) == Some(key_value))
            .take(limit)
            .cloned()
            .collect())
    }
}

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Rewriter driven by a closure; keeps every prompt it receives.
pub struct ScriptedRewriter {
    respond: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedRewriter {
    pub fn new(respond: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Err(anyhow!("{}", message)))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NarrativeRewriter for ScriptedRewriter {
    async fn rewrite(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .map_err(|_| anyhow!("rewriter prompt log poisoned"))?
            .push(prompt.to_string());
        (self.respond)(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> MetadataRecord {
        serde_json::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn test_store_filters_by_key_and_limit() {
        let store = InMemoryStore::new();
        store.insert("gif_metadata", record(json!({ "file_path": "a.gif", "n": 1 })));
        store.insert("gif_metadata", record(json!({ "file_path": "a.gif", "n": 2 })));
        store.insert("gif_metadata", record(json!({ "file_path": "b.gif", "n": 3 })));

        let rows = store
            .lookup_by_key("gif_metadata", "file_path", "a.gif", 1)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("n"), Some(&json!(1)));

        let missing = store
            .lookup_by_key("other_table", "file_path", "a.gif", 1)
            .await
            .unwrap();
        assert!(missing.is_empty());
        assert_eq!(store.lookups(), vec!["a.gif", "a.gif"]);
    }

    #[tokio::test]
    async fn test_retriever_truncates_to_top_k() {
        let frags = (0..8)
            .map(|i| ContextFragment::new(i as f64, serde_json::Map::new()))
            .collect();
        let retriever = InMemoryRetriever::new(frags);
        let got = retriever.match_context("q", 5).await.unwrap();
        assert_eq!(got.len(), 5);
        assert_eq!(retriever.calls(), vec![("q".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_failing_rewriter_records_prompt() {
        let rewriter = ScriptedRewriter::failing("quota exceeded");
        let err = rewriter.rewrite("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(rewriter.prompts(), vec!["hello"]);
    }
}
