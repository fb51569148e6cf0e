use chrono::{DateTime, Utc};
use glob::glob;
use humansize::{format_size, DECIMAL};
use std::path::{Path, PathBuf};
use tabled::Tabled;
use tokio::fs;

/// An archive found in the backup directory.
#[derive(Debug, Tabled, Clone, PartialEq)]
pub struct ArchiveItem {
    #[tabled(rename = "File")]
    pub key: String,
    #[tabled(rename = "Modified")]
    pub last_modified: DateTime<Utc>,
    #[tabled(skip)]
    pub size: u64,
    #[tabled(rename = "Size")]
    pub human_size: String,
}

/// Archives kept on the local filesystem.
pub struct LocalStorage {
    pub base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    /// Files under the base path matching `pattern`, newest first.
    pub async fn list(&self, pattern: &str) -> Result<Vec<ArchiveItem>, String> {
        let pattern = self.base_path.join(pattern).to_string_lossy().to_string();
        let mut items = Vec::new();

        let files = glob(&pattern).map_err(|e| e.to_string())?;

        for path in files.flatten() {
            let metadata = fs::metadata(&path).await.map_err(|e| e.to_string())?;
            if !metadata.is_file() {
                continue;
            }
            let last_modified: DateTime<Utc> = metadata
                .modified()
                .map_err(|e| format!("Failed to get modification time: {}", e))?
                .into();

            items.push(ArchiveItem {
                key: file_name(&path)?,
                last_modified,
                size: metadata.len(),
                human_size: format_size(metadata.len(), DECIMAL),
            });
        }

        items.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(items)
    }
}

fn file_name(path: &Path) -> Result<String, String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| format!("Invalid file path: {}", path.display()))
}
