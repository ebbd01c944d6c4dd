//! Wiring config to the core [`Resolver`], plus the `resolve` and `select`
//! CLI commands.

use anyhow::{bail, Result};
use std::sync::Arc;

use memory_recall_core::collaborators::MetadataStore;
use memory_recall_core::resolve::Resolver;
use memory_recall_core::select::tally;

use crate::config::Config;
use crate::postgrest_store::PostgrestStore;
use crate::retriever::HttpRetriever;
use crate::rewriter::create_rewriter;
use crate::sqlite_store::SqliteStore;

/// Construct the configured metadata store.
pub async fn create_store(config: &Config) -> Result<Arc<dyn MetadataStore>> {
    match config.store.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteStore::open(&config.store.path).await?)),
        "postgrest" => Ok(Arc::new(PostgrestStore::from_config(&config.store)?)),
        other => bail!("Unknown store backend: {}", other),
    }
}

/// Build a [`Resolver`] with every collaborator taken from configuration.
pub async fn build_resolver(config: &Config) -> Result<Resolver> {
    let retriever = Arc::new(HttpRetriever::from_config(&config.retriever)?);
    let store = create_store(config).await?;
    let rewriter = create_rewriter(&config.rewrite)?;
    Ok(Resolver::new(
        retriever,
        store,
        rewriter,
        config.resolver_settings(),
    ))
}

/// `recall resolve`: run the full pipeline and print the record as JSON.
pub async fn run_resolve(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let resolver = build_resolver(config).await?;
    let resolved = resolver.resolve_memory(query).await?;

    println!("{}", serde_json::to_string_pretty(&resolved.record)?);
    Ok(())
}

/// `recall select`: normalize, retrieve, and vote without touching the store.
pub async fn run_select(config: &Config, query: &str, explain: bool) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let resolver = build_resolver(config).await?;
    let normalized = resolver.normalize_query(query).await?;
    let fragments = resolver.retrieve(&normalized).await?;

    if explain {
        println!("query: {}", normalized);
        println!(
            "fragments: {} (threshold {:.2})",
            fragments.len(),
            resolver.settings().threshold
        );
        for group in tally(&fragments, &resolver.settings().key_field) {
            println!(
                "  {:>2} × {}  [max {:.3}, first at #{}]",
                group.count,
                group.item_key,
                group.max_score,
                group.first_index + 1
            );
        }
        println!();
    }

    let selection = resolver.select(&fragments)?;
    println!(
        "{} (confidence {:.3}, {}/{} keyed fragments)",
        selection.item_key, selection.confidence, selection.group_size, selection.keyed
    );
    Ok(())
}
