use super::{create_output_dir, ensure_absent, remove_intermediate, Database, ExportResult};
use crate::compression::Gzip;
use crate::config::{PostgreSqlConfig, ToolPaths};
use crate::error::BackupError;
use crate::process::{pipe_checked, run_checked, Invocation, ProcessRunner, SystemRunner};
use chrono::Utc;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

const ARCHIVE_LEVEL: u8 = 9;

/// Backs up a PostgreSQL database with `pg_dump -Fc` and restores it with
/// `pg_restore`.
#[derive(Clone)]
pub struct PostgreSql {
    config: PostgreSqlConfig,
    pg_dump: String,
    pg_restore: String,
    gzip: Gzip,
    output_dir: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl Deref for PostgreSql {
    type Target = PostgreSqlConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

#[async_trait::async_trait]
impl Database for PostgreSql {
    async fn export(&self) -> ExportResult {
        let result = ExportResult::new();
        let dump_path = self.dump_path(Utc::now().timestamp());

        match self.export_to(&dump_path).await {
            Ok(path) => ExportResult { path, ..result },
            Err(e) => {
                error!("PostgreSQL export of {} failed: {}", self.db, e);
                result.failed(e)
            }
        }
    }

    async fn import(&self, archive: &Path) -> Result<(), BackupError> {
        info!("Restoring PostgreSQL database {} from {:?}", self.db, archive);
        let restore =
            self.with_password(Invocation::new(&self.pg_restore).args(self.dump_options()));
        pipe_checked(
            self.runner.as_ref(),
            &self.gzip.decompress_invocation(archive),
            &restore,
        )
        .await?;
        info!("PostgreSQL database {} restored", self.db);
        Ok(())
    }

    fn engine_name(&self) -> &'static str {
        "postgresql"
    }
}

impl PostgreSql {
    pub fn new(config: &PostgreSqlConfig, tools: &ToolPaths) -> Self {
        PostgreSql {
            config: config.clone(),
            pg_dump: tools.pg_dump.clone(),
            pg_restore: tools.pg_restore.clone(),
            gzip: Gzip::new(&tools.gzip),
            output_dir: PathBuf::new(),
            runner: Arc::new(SystemRunner),
        }
    }

    /// Directory for relative filenames; the current directory by default.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// The configured filename, or `bu_<db>_<unix seconds>.dump` when none is set.
    pub fn dump_path(&self, timestamp: i64) -> PathBuf {
        if self.filename.is_empty() {
            self.output_dir.join(format!("bu_{}_{}.dump", self.db, timestamp))
        } else {
            self.output_dir.join(&self.filename)
        }
    }

    /// Connection arguments shared by `pg_dump` and `pg_restore`. Each flag is
    /// only emitted for a non-empty field so the tools can fall back to their
    /// defaults.
    pub fn dump_options(&self) -> Vec<String> {
        let mut options = self.options.clone();
        let flags = [
            ("-d", &self.db),
            ("-h", &self.host),
            ("-p", &self.port),
            ("-U", &self.username),
        ];
        for (flag, value) in flags {
            if !value.is_empty() {
                options.push(flag.to_string());
                options.push(value.clone());
            }
        }
        options
    }

    pub fn export_invocation(&self, dump_path: &Path) -> Invocation {
        self.with_password(
            Invocation::new(&self.pg_dump)
                .args(["-Fc", "-f"])
                .arg(dump_path.to_string_lossy().into_owned())
                .args(self.dump_options()),
        )
    }

    fn with_password(&self, invocation: Invocation) -> Invocation {
        if self.password.is_empty() {
            invocation
        } else {
            invocation.env("PGPASSWORD", &self.password)
        }
    }

    /// A configured filename is overwritten on every export; only derived
    /// names are guarded against collisions.
    async fn export_to(&self, dump_path: &Path) -> Result<PathBuf, BackupError> {
        if self.filename.is_empty() {
            ensure_absent(&Gzip::archive_path(dump_path)).await?;
        }
        if let Some(parent) = dump_path.parent() {
            create_output_dir(parent).await?;
        }

        info!("Dumping PostgreSQL database {} to {:?}", self.db, dump_path);
        run_checked(self.runner.as_ref(), &self.export_invocation(dump_path)).await?;

        let archive = self
            .gzip
            .compress(self.runner.as_ref(), dump_path, Some(ARCHIVE_LEVEL))
            .await?;
        remove_intermediate(dump_path).await;

        info!("PostgreSQL backup of {} created: {:?}", self.db, archive);
        Ok(archive)
    }
}
