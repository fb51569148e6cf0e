// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbarchive")]
#[command(about = "MySQL/PostgreSQL export and restore through gzip archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Specific file for configuration
    #[arg(short, long)]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export the configured database into a gzip archive
    Export,

    /// Restore the configured database from an archive
    Import {
        /// Archive produced by `export`
        file: PathBuf,
    },

    /// List archives in the backup directory
    List,

    /// Show tool version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "dbarchive",
            "--config",
            "dbarchive.toml",
            "import",
            "bu_shop_1.sql.gz",
        ])
        .unwrap();
        assert_eq!(cli.config, "dbarchive.toml");
        match cli.command {
            Commands::Import { file } => assert_eq!(file, PathBuf::from("bu_shop_1.sql.gz")),
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["dbarchive", "export"]).is_err());
    }
}
