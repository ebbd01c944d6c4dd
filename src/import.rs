//! Bulk loading of metadata records into the SQLite store.
//!
//! Input is a JSON array of objects, each carrying the configured key
//! column (`file_path` by default). Existing rows with the same key are
//! replaced.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use memory_recall_core::models::MetadataRecord;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Parse a JSON array of records, rejecting entries without a string key.
pub fn parse_records(content: &str, key_field: &str) -> Result<Vec<MetadataRecord>> {
    let value: Value = serde_json::from_str(content).context("import file is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("import file must contain a JSON array of records");
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(fields) = item else {
                bail!("record {} is not a JSON object", i);
            };
            let record = MetadataRecord::new(fields);
            if record.get_str(key_field).is_none() {
                bail!("record {} is missing string field '{}'", i, key_field);
            }
            Ok(record)
        })
        .collect()
}

/// Import records from `path` and return how many were written.
pub async fn run_import(config: &Config, path: &Path) -> Result<usize> {
    if config.store.backend != "sqlite" {
        bail!(
            "import only applies to the sqlite backend (configured: '{}')",
            config.store.backend
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let records = parse_records(&content, &config.store.key_field)?;

    let store = SqliteStore::open(&config.store.path).await?;
    store
        .ensure_table(&config.store.table, &config.store.key_field)
        .await?;
    for record in &records {
        store
            .upsert_record(&config.store.table, &config.store.key_field, record)
            .await?;
    }
    store.pool().close().await;

    tracing::info!(records = records.len(), table = %config.store.table, "import complete");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_ok() {
        let records = parse_records(
            r#"[{"file_path": "a.gif", "summary": "x"}, {"file_path": "b.gif"}]"#,
            "file_path",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get_str("file_path"), Some("b.gif"));
    }

    #[test]
    fn test_parse_records_rejects_missing_key() {
        let err = parse_records(r#"[{"summary": "x"}]"#, "file_path").unwrap_err();
        assert!(err.to_string().contains("record 0"));
    }

    #[test]
    fn test_parse_records_rejects_non_array() {
        assert!(parse_records(r#"{"file_path": "a.gif"}"#, "file_path").is_err());
    }
}
