//! The recall pipeline: normalize → retrieve → select → look up → enrich.
//!
//! [`Resolver`] owns shared handles to the three collaborators plus
//! read-only [`ResolverSettings`]. Each call to
//! [`resolve_memory`](Resolver::resolve_memory) runs the stages strictly in
//! order and stops at the first failure; nothing is retried or cached, and
//! no partially enriched record is ever returned.
//!
//! The individual stages are public so frontends can run a subset (the
//! CLI's `select` command stops after the vote).

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use tracing::{debug, info};

use crate::collaborators::{ContextRetriever, MetadataStore, NarrativeRewriter};
use crate::error::{RecallError, Stage};
use crate::models::{ContextFragment, EnrichedRecord, MetadataRecord, Selection};
use crate::prompts;
use crate::select;

/// Tuning knobs and field names, fixed at construction.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Minimum acceptable top score within the winning group (τ).
    pub threshold: f64,
    /// Number of fragments requested from the retriever.
    pub top_k: usize,
    /// Fragment metadata field holding the grouping key.
    pub key_field: String,
    /// Metadata store table.
    pub table: String,
    /// Store column matched against the selected key.
    pub store_key_field: String,
    /// Record field replaced during enrichment.
    pub summary_field: String,
    /// Rewrite the query before retrieval.
    pub normalize_query: bool,
    /// Rewrite the record summary before returning.
    pub enrich_summary: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            threshold: 0.35,
            top_k: 5,
            key_field: "gif_path".to_string(),
            table: "gif_metadata".to_string(),
            store_key_field: "file_path".to_string(),
            summary_field: "summary".to_string(),
            normalize_query: true,
            enrich_summary: true,
        }
    }
}

/// Turns a free-text recall query into one confident, enriched record.
#[derive(Clone)]
pub struct Resolver {
    retriever: Arc<dyn ContextRetriever>,
    store: Arc<dyn MetadataStore>,
    rewriter: Arc<dyn NarrativeRewriter>,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        store: Arc<dyn MetadataStore>,
        rewriter: Arc<dyn NarrativeRewriter>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            retriever,
            store,
            rewriter,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Run the full pipeline for one query.
    pub async fn resolve_memory(&self, query: &str) -> Result<EnrichedRecord, RecallError> {
        let query = self.normalize_query(query).await?;
        let fragments = self.retrieve(&query).await?;
        let selection = self.select(&fragments)?;
        let record = self.lookup(&selection).await?;
        let record = self.enrich(&record).await?;

        info!(
            item_key = %selection.item_key,
            confidence = selection.confidence,
            group_size = selection.group_size,
            "memory resolved"
        );

        Ok(EnrichedRecord {
            record,
            selection,
            query,
        })
    }

    /// Rewrite the query into memory-like phrasing, or pass it through when
    /// normalization is disabled.
    pub async fn normalize_query(&self, query: &str) -> Result<String, RecallError> {
        if !self.settings.normalize_query {
            return Ok(query.to_string());
        }
        let rewritten = self
            .rewriter
            .rewrite(&prompts::normalize_query_prompt(query))
            .await
            .map_err(|e| RecallError::collaborator(Stage::Normalizing, e))?;
        let rewritten = rewritten.trim().to_string();
        debug!(original = %query, rewritten = %rewritten, "query normalized");
        Ok(rewritten)
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ContextFragment>, RecallError> {
        let fragments = self
            .retriever
            .match_context(query, self.settings.top_k)
            .await
            .map_err(|e| RecallError::collaborator(Stage::Retrieving, e))?;
        debug!(
            fragments = fragments.len(),
            top_k = self.settings.top_k,
            "context retrieved"
        );
        Ok(fragments)
    }

    /// Majority vote plus confidence gate; see [`select::select`].
    pub fn select(&self, fragments: &[ContextFragment]) -> Result<Selection, RecallError> {
        let selection = select::select(
            fragments,
            &self.settings.key_field,
            self.settings.threshold,
        );
        match &selection {
            Ok(sel) => debug!(
                item_key = %sel.item_key,
                confidence = sel.confidence,
                group_size = sel.group_size,
                keyed = sel.keyed,
                seen = sel.seen,
                "selection made"
            ),
            Err(e) => debug!(error = %e, "selection rejected"),
        }
        selection
    }

    /// Fetch the single metadata record for the selected item.
    pub async fn lookup(&self, selection: &Selection) -> Result<MetadataRecord, RecallError> {
        let rows = self
            .store
            .lookup_by_key(
                &self.settings.table,
                &self.settings.store_key_field,
                &selection.item_key,
                1,
            )
            .await
            .map_err(|e| RecallError::collaborator(Stage::LookingUp, e))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| RecallError::RecordNotFound {
                item_key: selection.item_key.clone(),
            })
    }

    /// Return a copy of `record` with its summary rewritten.
    ///
    /// A record without the summary field fails the enrichment stage. A
    /// non-string summary is rewritten from its JSON text.
    pub async fn enrich(&self, record: &MetadataRecord) -> Result<MetadataRecord, RecallError> {
        if !self.settings.enrich_summary {
            return Ok(record.clone());
        }
        let field = &self.settings.summary_field;
        let summary = match record.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(RecallError::collaborator(
                    Stage::Enriching,
                    anyhow!("record has no '{}' field", field),
                ))
            }
        };
        let rewritten = self
            .rewriter
            .rewrite(&prompts::enrich_summary_prompt(&summary))
            .await
            .map_err(|e| RecallError::collaborator(Stage::Enriching, e))?;
        Ok(record.with_field(field, rewritten))
    }
}
