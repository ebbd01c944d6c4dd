use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use memory_recall_core::resolve::ResolverSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
    pub retriever: RetrieverConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_key_field")]
    pub key_field: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            top_k: default_top_k(),
            key_field: default_key_field(),
        }
    }
}

fn default_threshold() -> f64 {
    0.35
}
fn default_top_k() -> usize {
    5
}
fn default_key_field() -> String {
    "gif_path".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RewriteConfig {
    #[serde(default = "default_true")]
    pub normalize_query: bool,
    #[serde(default = "default_true")]
    pub enrich_summary: bool,
    #[serde(default = "default_rewrite_provider")]
    pub provider: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            normalize_query: true,
            enrich_summary: true,
            provider: default_rewrite_provider(),
            base_url: None,
            model: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RewriteConfig {
    pub fn is_needed(&self) -> bool {
        self.normalize_query || self.enrich_summary
    }

    /// Environment variable holding the rewriter key, per provider.
    pub fn key_env(&self) -> &str {
        match (&self.api_key_env, self.provider.as_str()) {
            (Some(var), _) => var,
            (None, "openai") => "OPENAI_API_KEY",
            (None, _) => "VIARAG_KEY",
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_rewrite_provider() -> String {
    "viarag".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrieverConfig {
    pub base_url: String,
    #[serde(default = "default_retriever_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_retriever_key_env() -> String {
    "VIARAG_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_store_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_store_key_field")]
    pub key_field: String,
    #[serde(default = "default_summary_field")]
    pub summary_field: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            url: None,
            api_key_env: default_store_key_env(),
            table: default_table(),
            key_field: default_store_key_field(),
            summary_field: default_summary_field(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_backend() -> String {
    "sqlite".to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./data/recall.sqlite")
}
fn default_store_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".to_string()
}
fn default_table() -> String {
    "gif_metadata".to_string()
}
fn default_store_key_field() -> String {
    "file_path".to_string()
}
fn default_summary_field() -> String {
    "summary".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    /// Settings handed to the core [`Resolver`](memory_recall_core::resolve::Resolver).
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            threshold: self.selection.threshold,
            top_k: self.selection.top_k,
            key_field: self.selection.key_field.clone(),
            table: self.store.table.clone(),
            store_key_field: self.store.key_field.clone(),
            summary_field: self.store.summary_field.clone(),
            normalize_query: self.rewrite.normalize_query,
            enrich_summary: self.rewrite.enrich_summary,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate selection
    if !config.selection.threshold.is_finite() {
        anyhow::bail!("selection.threshold must be a finite number");
    }
    if config.selection.top_k == 0 {
        anyhow::bail!("selection.top_k must be >= 1");
    }
    if config.selection.key_field.trim().is_empty() {
        anyhow::bail!("selection.key_field must not be empty");
    }

    // Validate retriever
    if config.retriever.base_url.trim().is_empty() {
        anyhow::bail!("retriever.base_url must not be empty");
    }

    // Validate rewriter
    match config.rewrite.provider.as_str() {
        "viarag" => {
            if config.rewrite.is_needed() && config.rewrite.base_url.is_none() {
                anyhow::bail!("rewrite.base_url must be specified when provider is 'viarag'");
            }
        }
        "openai" => {
            if config.rewrite.is_needed() && config.rewrite.model.is_none() {
                anyhow::bail!("rewrite.model must be specified when provider is 'openai'");
            }
        }
        "disabled" => {
            if config.rewrite.is_needed() {
                anyhow::bail!(
                    "rewrite.provider is 'disabled' but normalize_query or enrich_summary is on"
                );
            }
        }
        other => anyhow::bail!(
            "Unknown rewrite provider: '{}'. Must be viarag, openai, or disabled.",
            other
        ),
    }

    // Validate store
    match config.store.backend.as_str() {
        "sqlite" => {}
        "postgrest" => {
            if config.store.url.is_none() {
                anyhow::bail!("store.url must be specified when backend is 'postgrest'");
            }
        }
        other => anyhow::bail!(
            "Unknown store backend: '{}'. Must be sqlite or postgrest.",
            other
        ),
    }
    if config.store.table.trim().is_empty() || config.store.key_field.trim().is_empty() {
        anyhow::bail!("store.table and store.key_field must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    const MINIMAL: &str = r#"
[retriever]
base_url = "http://127.0.0.1:9000"

[rewrite]
base_url = "http://127.0.0.1:9000"
"#;

    #[test]
    fn test_defaults() {
        let cfg = parse(MINIMAL).unwrap();
        assert!((cfg.selection.threshold - 0.35).abs() < 1e-9);
        assert_eq!(cfg.selection.top_k, 5);
        assert_eq!(cfg.selection.key_field, "gif_path");
        assert_eq!(cfg.store.backend, "sqlite");
        assert_eq!(cfg.store.table, "gif_metadata");
        assert_eq!(cfg.store.key_field, "file_path");
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
        assert_eq!(cfg.rewrite.key_env(), "VIARAG_KEY");

        let settings = cfg.resolver_settings();
        assert_eq!(settings.summary_field, "summary");
        assert!(settings.normalize_query && settings.enrich_summary);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let src = format!("{}\n[selection]\ntop_k = 0\n", MINIMAL);
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_disabled_rewriter_requires_toggles_off() {
        let src = r#"
[retriever]
base_url = "http://127.0.0.1:9000"

[rewrite]
provider = "disabled"
"#;
        assert!(parse(src).is_err());

        let src = r#"
[retriever]
base_url = "http://127.0.0.1:9000"

[rewrite]
provider = "disabled"
normalize_query = false
enrich_summary = false
"#;
        assert!(parse(src).is_ok());
    }

    #[test]
    fn test_openai_key_env_default() {
        let src = r#"
[retriever]
base_url = "http://127.0.0.1:9000"

[rewrite]
provider = "openai"
model = "gpt-4o-mini"
"#;
        let cfg = parse(src).unwrap();
        assert_eq!(cfg.rewrite.key_env(), "OPENAI_API_KEY");
    }

    #[test]
    fn test_postgrest_requires_url() {
        let src = format!("{}\n[store]\nbackend = \"postgrest\"\n", MINIMAL);
        assert!(parse(&src).is_err());
    }

    #[test]
    fn test_unknown_store_backend_rejected() {
        let src = format!("{}\n[store]\nbackend = \"mongo\"\n", MINIMAL);
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("Unknown store backend"));
    }
}
