use super::{create_output_dir, ensure_absent, remove_intermediate, Database, ExportResult};
use crate::compression::Gzip;
use crate::config::{MySqlConfig, ToolPaths};
use crate::error::BackupError;
use crate::process::{pipe_checked, run_checked, Invocation, ProcessRunner, SystemRunner};
use chrono::Utc;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Backs up a MySQL database with `mysqldump` and restores it with `mysql`.
#[derive(Clone)]
pub struct MySql {
    config: MySqlConfig,
    mysqldump: String,
    mysql: String,
    gzip: Gzip,
    output_dir: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl Deref for MySql {
    type Target = MySqlConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

#[async_trait::async_trait]
impl Database for MySql {
    async fn export(&self) -> ExportResult {
        let result = ExportResult::new();
        let dump_path = self.dump_path(Utc::now().timestamp());

        match self.export_to(&dump_path).await {
            Ok(path) => ExportResult { path, ..result },
            Err(e) => {
                error!("MySQL export of {} failed: {}", self.db, e);
                result.failed(e)
            }
        }
    }

    async fn import(&self, archive: &Path) -> Result<(), BackupError> {
        info!("Restoring MySQL database {} from {:?}", self.db, archive);
        let restore = Invocation::new(&self.mysql).args(self.dump_options());
        pipe_checked(
            self.runner.as_ref(),
            &self.gzip.decompress_invocation(archive),
            &restore,
        )
        .await?;
        info!("MySQL database {} restored", self.db);
        Ok(())
    }

    fn engine_name(&self) -> &'static str {
        "mysql"
    }
}

impl MySql {
    pub fn new(config: &MySqlConfig, tools: &ToolPaths) -> Self {
        MySql {
            config: config.clone(),
            mysqldump: tools.mysqldump.clone(),
            mysql: tools.mysql.clone(),
            gzip: Gzip::new(&tools.gzip),
            output_dir: PathBuf::new(),
            runner: Arc::new(SystemRunner),
        }
    }

    /// Directory receiving dumps and archives; the current directory by default.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// `bu_<db>_<unix seconds>.sql` inside the output directory. Two exports of
    /// the same database within one second map to the same name.
    pub fn dump_path(&self, timestamp: i64) -> PathBuf {
        self.output_dir.join(format!("bu_{}_{}.sql", self.db, timestamp))
    }

    /// Connection arguments shared by `mysqldump` and `mysql`. Host, port and
    /// user are always passed; the password only when set.
    pub fn dump_options(&self) -> Vec<String> {
        let mut options = self.options.clone();
        options.push(format!("-h{}", self.host));
        options.push(format!("-P{}", self.port));
        options.push(format!("-u{}", self.user));
        if !self.password.is_empty() {
            options.push(format!("-p{}", self.password));
        }
        options.push(self.db.clone());
        options
    }

    pub fn export_invocation(&self, dump_path: &Path) -> Invocation {
        Invocation::new(&self.mysqldump)
            .args(self.dump_options())
            .arg(format!("-r{}", dump_path.display()))
    }

    async fn export_to(&self, dump_path: &Path) -> Result<PathBuf, BackupError> {
        ensure_absent(&Gzip::archive_path(dump_path)).await?;
        create_output_dir(&self.output_dir).await?;

        info!("Dumping MySQL database {} to {:?}", self.db, dump_path);
        run_checked(self.runner.as_ref(), &self.export_invocation(dump_path)).await?;

        // A failed compression leaves the dump on disk for inspection.
        let archive = self
            .gzip
            .compress(self.runner.as_ref(), dump_path, None)
            .await?;
        remove_intermediate(dump_path).await;

        info!("MySQL backup of {} created: {:?}", self.db, archive);
        Ok(archive)
    }
}
