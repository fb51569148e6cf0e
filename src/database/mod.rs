pub mod mysql;
pub mod postgresql;

use crate::compression::GZIP_MIME;
use crate::error::BackupError;
use mysql::MySql;
use postgresql::PostgreSql;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Outcome of an export.
///
/// When `error` is set the export failed and `path` must not be used: it may
/// name an archive that was never completed.
#[derive(Debug)]
pub struct ExportResult {
    pub path: PathBuf,
    pub mime: &'static str,
    pub error: Option<BackupError>,
}

impl ExportResult {
    fn new() -> Self {
        ExportResult {
            path: PathBuf::new(),
            mime: GZIP_MIME,
            error: None,
        }
    }

    fn failed(mut self, error: BackupError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The archive path, or the error if the export failed.
    pub fn into_result(self) -> Result<PathBuf, BackupError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.path),
        }
    }
}

/// Export/import contract shared by every engine.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Dumps the whole database and compresses it into a gzip archive.
    async fn export(&self) -> ExportResult;

    /// Restores the database from an archive produced by [`Database::export`].
    async fn import(&self, archive: &Path) -> Result<(), BackupError>;

    fn engine_name(&self) -> &'static str;
}

/// Backend chosen explicitly by the caller.
pub enum Backend {
    MySql(MySql),
    PostgreSql(PostgreSql),
}

impl Backend {
    fn inner(&self) -> &dyn Database {
        match self {
            Backend::MySql(db) => db,
            Backend::PostgreSql(db) => db,
        }
    }
}

#[async_trait::async_trait]
impl Database for Backend {
    async fn export(&self) -> ExportResult {
        self.inner().export().await
    }

    async fn import(&self, archive: &Path) -> Result<(), BackupError> {
        self.inner().import(archive).await
    }

    fn engine_name(&self) -> &'static str {
        self.inner().engine_name()
    }
}

/// Refuses to overwrite an archive left by an earlier export. The check runs
/// before the dump starts, so it only catches exports that ran earlier, not
/// two exports racing in the same second.
async fn ensure_absent(archive: &Path) -> Result<(), BackupError> {
    if tokio::fs::try_exists(archive).await? {
        return Err(BackupError::ArchiveExists(archive.to_path_buf()));
    }
    Ok(())
}

/// Best-effort removal of an intermediate dump; failures are only logged.
async fn remove_intermediate(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove intermediate dump {:?}: {}", path, e);
    }
}

async fn create_output_dir(dir: &Path) -> Result<(), BackupError> {
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}
