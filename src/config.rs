use crate::database::mysql::MySql;
use crate::database::postgresql::PostgreSql;
use crate::database::Backend;
use crate::utils::resolve_path;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AllConfig {
    pub app: AppConfig,
    #[serde(default)]
    pub tools: ToolPaths,
    pub mysql: Option<MySqlConfig>,
    pub postgresql: Option<PostgreSqlConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    pub db_type: DbType,
}

/// Executables used by the backends. Each defaults to the bare program name,
/// resolved through `PATH`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ToolPaths {
    pub gzip: String,
    pub mysqldump: String,
    pub mysql: String,
    pub pg_dump: String,
    pub pg_restore: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            gzip: "gzip".into(),
            mysqldump: "mysqldump".into(),
            mysql: "mysql".into(),
            pg_dump: "pg_dump".into(),
            pg_restore: "pg_restore".into(),
        }
    }
}

/// MySQL connection descriptor.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MySqlConfig {
    pub host: String,
    pub port: String,
    pub db: String,
    pub user: String,
    pub password: String,
    /// Extra mysqldump options, e.g. `--extended-insert`
    pub options: Vec<String>,
}

/// PostgreSQL connection descriptor. Empty fields fall back to the tools' own
/// defaults (local socket, default port, current user).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PostgreSqlConfig {
    pub host: String,
    pub port: String,
    pub db: String,
    pub username: String,
    pub password: String,
    /// Dump file to write; the archive is this path plus `.gz`
    pub filename: String,
    /// Extra pg_dump/pg_restore options, e.g. `--no-owner`
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    #[serde(rename = "mysql")]
    Mysql,
    #[serde(rename = "postgresql")]
    Postgresql,
}

fn default_backup_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".dbbackup")
        .display()
        .to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backup_dir: default_backup_dir(),
            db_type: DbType::Postgresql,
        }
    }
}

impl AppConfig {
    pub fn get_backup_dir(&self) -> PathBuf {
        match resolve_path(&self.backup_dir) {
            Ok(p) => p,
            Err(_) => AppConfig::default().backup_dir.into(),
        }
    }

    /// Builds the backend selected by `db_type`.
    pub fn database(&self, config: &AllConfig) -> anyhow::Result<Backend> {
        let backup_dir = self.get_backup_dir();
        match self.db_type {
            DbType::Mysql => {
                let Some(mysql) = &config.mysql else {
                    anyhow::bail!("db_type is mysql but the [mysql] section is missing");
                };
                Ok(Backend::MySql(
                    MySql::new(mysql, &config.tools).with_output_dir(backup_dir),
                ))
            }
            DbType::Postgresql => {
                let Some(postgresql) = &config.postgresql else {
                    anyhow::bail!("db_type is postgresql but the [postgresql] section is missing");
                };
                Ok(Backend::PostgreSql(
                    PostgreSql::new(postgresql, &config.tools).with_output_dir(backup_dir),
                ))
            }
        }
    }
}

/// Loads the configuration file, then applies `DBARCHIVE_*` environment
/// overrides (e.g. `DBARCHIVE_TOOLS__PG_DUMP=/usr/lib/postgresql/16/bin/pg_dump`).
pub fn get_all_config(config_path: &str) -> anyhow::Result<AllConfig, ConfigError> {
    let config_builder = Config::builder()
        .add_source(File::with_name(config_path))
        .add_source(
            Environment::with_prefix("DBARCHIVE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config = config_builder.try_deserialize()?;
    Ok(config)
}
