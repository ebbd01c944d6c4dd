//! Traits for the external systems the resolver depends on.
//!
//! Each trait is the narrow contract of one collaborator. Implementations
//! must be `Send + Sync` so a single [`Resolver`](crate::resolve::Resolver)
//! can serve concurrent requests; they own their transport, timeout, and
//! authentication concerns.
//!
//! | Trait | Used by stage |
//! |-------|---------------|
//! | [`ContextRetriever`] | retrieval |
//! | [`MetadataStore`] | metadata lookup |
//! | [`NarrativeRewriter`] | query normalization, summary enrichment |

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ContextFragment, MetadataRecord};

/// Vector memory search over pre-indexed context fragments.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Return up to `top_k` fragments ranked by relevance to `query`.
    async fn match_context(&self, query: &str, top_k: usize) -> Result<Vec<ContextFragment>>;
}

/// Keyed lookup of structured media metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Return at most `limit` records in `table` whose `key_field` equals
    /// `key_value`. An empty vector means "not found".
    async fn lookup_by_key(
        &self,
        table: &str,
        key_field: &str,
        key_value: &str,
        limit: usize,
    ) -> Result<Vec<MetadataRecord>>;
}

/// Free-text rewriting service (an LLM behind a prompt).
#[async_trait]
pub trait NarrativeRewriter: Send + Sync {
    /// Rewrite according to the instruction embedded in `prompt`.
    async fn rewrite(&self, prompt: &str) -> Result<String>;
}
