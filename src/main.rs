// src/main.rs

use anyhow::Result;
use clap::Parser;
use dbarchive::cli::command::{export_database, import_database, list_archives};
use dbarchive::cli::{Cli, Commands};
use dbarchive::config::get_all_config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match get_all_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            anyhow::bail!(e);
        }
    };
    let app_config = &config.app;

    match cli.command {
        Commands::Export => {
            let db = app_config.database(&config)?;
            let archive = export_database(&db).await?;
            println!("{}", archive.display());
            Ok(())
        }
        Commands::Import { file } => {
            let db = app_config.database(&config)?;
            import_database(&db, &file).await
        }
        Commands::List => {
            let backup_dir = app_config.get_backup_dir();
            info!("Listing archives in {:?}", backup_dir);
            println!("{}", list_archives(&backup_dir).await?);
            Ok(())
        }
        Commands::Version => {
            println!("dbarchive v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
