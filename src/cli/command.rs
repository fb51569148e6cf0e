use crate::database::Database;
use crate::storage::LocalStorage;
use crate::utils;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn export_database(db: &dyn Database) -> Result<PathBuf> {
    info!("Starting {} export", db.engine_name());
    let result = db.export().await;
    let archive = result.into_result()?;
    info!("Export completed successfully: {:?}", archive);
    Ok(archive)
}

pub async fn import_database(db: &dyn Database, archive: &Path) -> Result<()> {
    if !archive.exists() {
        anyhow::bail!("Archive not found: {}", archive.display());
    }
    info!("Starting {} import from {:?}", db.engine_name(), archive);
    db.import(archive).await?;
    info!("Import completed successfully");
    Ok(())
}

pub async fn list_archives(backup_dir: &Path) -> Result<String> {
    let storage = LocalStorage::new(backup_dir);
    let items = storage.list("*.gz").await.map_err(anyhow::Error::msg)?;
    Ok(utils::render_archives(&items))
}
