use anyhow::{bail, Result};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Create the metadata table for the SQLite backend. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    if config.store.backend != "sqlite" {
        bail!(
            "init only applies to the sqlite backend (configured: '{}')",
            config.store.backend
        );
    }

    let store = SqliteStore::open(&config.store.path).await?;
    store
        .ensure_table(&config.store.table, &config.store.key_field)
        .await?;

    store.pool().close().await;
    Ok(())
}
