//! SQLite-backed [`MetadataStore`].
//!
//! Each table holds one row per media item: the key column (by default
//! `file_path`), the full record as JSON, and an `updated_at` timestamp.
//! Table and column names come from configuration, so they are validated
//! as plain identifiers and quoted before being spliced into SQL.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

use memory_recall_core::collaborators::MetadataStore;
use memory_recall_core::models::MetadataRecord;

/// Open (creating if needed) the SQLite database at `path`.
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    Ok(pool)
}

/// Double-quote an identifier after checking it is `[A-Za-z_][A-Za-z0-9_]*`.
pub fn quote_ident(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid SQL identifier: '{}'", name);
    }
    Ok(format!("\"{}\"", name))
}

/// SQLite implementation of [`MetadataStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(connect(path).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create `table` keyed by `key_field` if it does not exist.
    pub async fn ensure_table(&self, table: &str, key_field: &str) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                {} TEXT PRIMARY KEY,
                record_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            quote_ident(table)?,
            quote_ident(key_field)?,
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert or replace one record. The record must carry a string `key_field`.
    pub async fn upsert_record(
        &self,
        table: &str,
        key_field: &str,
        record: &MetadataRecord,
    ) -> Result<()> {
        let Some(key) = record.get_str(key_field) else {
            bail!("record is missing string field '{}'", key_field);
        };
        let sql = format!(
            "INSERT INTO {table} ({key_col}, record_json, updated_at) VALUES (?, ?, ?)
             ON CONFLICT({key_col}) DO UPDATE SET
                record_json = excluded.record_json,
                updated_at = excluded.updated_at",
            table = quote_ident(table)?,
            key_col = quote_ident(key_field)?,
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(serde_json::to_string(record)?)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn lookup_by_key(
        &self,
        table: &str,
        key_field: &str,
        key_value: &str,
        limit: usize,
    ) -> Result<Vec<MetadataRecord>> {
        let sql = format!(
            "SELECT record_json FROM {} WHERE {} = ? LIMIT ?",
            quote_ident(table)?,
            quote_ident(key_field)?,
        );
        let rows = sqlx::query(&sql)
            .bind(key_value)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let raw: String = row.get("record_json");
                let mut fields: Map<String, Value> = serde_json::from_str(&raw)
                    .with_context(|| format!("corrupt record_json for {}", key_value))?;
                fields
                    .entry(key_field.to_string())
                    .or_insert_with(|| Value::String(key_value.to_string()));
                Ok(MetadataRecord::new(fields))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_accepts_plain_names() {
        assert_eq!(quote_ident("gif_metadata").unwrap(), "\"gif_metadata\"");
        assert_eq!(quote_ident("_x1").unwrap(), "\"_x1\"");
    }

    #[test]
    fn test_quote_ident_rejects_injection() {
        assert!(quote_ident("").is_err());
        assert!(quote_ident("1table").is_err());
        assert!(quote_ident("gif\"; DROP TABLE x; --").is_err());
        assert!(quote_ident("file path").is_err());
    }
}
